mod auth;
mod health_check;
mod recovery;
mod session;
mod verification;

pub use auth::{deactivate, login, me, register, step_up};
pub use health_check::health_check;
pub use recovery::{forgot_email, forgot_password, reset_password};
pub use session::{logout, logout_all, refresh};
pub use verification::{verify_email, verify_sms};
