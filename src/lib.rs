pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod model;
pub mod notify;
pub mod routes;
pub mod secret;
pub mod security;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validators;
