pub mod auth;
pub mod client_key;
pub mod throttle;
