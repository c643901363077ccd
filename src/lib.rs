pub mod config;
pub mod db;
pub mod error;
pub mod lightroom;
pub mod oauth_utils;
pub mod server;
pub mod sync;
pub mod utils;

pub use error::ApertureError;
