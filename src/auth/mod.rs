/// Authentication core
///
/// Credential verification, lockout, step-up, session issuance, and the
/// verification and reset workflows. Everything here is generic over the
/// credential store and notification dispatcher seams.
pub mod account;
pub mod claims;
pub mod jwt;
pub mod lockout;
pub mod login;
pub mod opaque;
pub mod password;
pub mod registration;
pub mod reset;
pub mod session;

pub use claims::Claims;
pub use login::{Credentials, LoginOutcome};
pub use registration::NewRegistration;
pub use session::GrantedSession;
