mod aperture;
mod oauth;

pub use aperture::{ApiErrorBody, ApiErrorObject, ApertureError};
pub use oauth::OauthError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
