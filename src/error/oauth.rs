use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use thiserror::Error as ThisError;

use super::aperture::ApertureError;

/// Failures of the Adobe IMS authorization-code flow.
#[derive(Debug, ThisError)]
pub enum OauthError {
    /// Rejected by aperture itself (missing CSRF cookie, state mismatch, empty token).
    /// `code` is a stable identifier returned to the browser.
    #[error("OAuth flow error ({code}): {message}")]
    Flow { code: &'static str, message: String },

    #[error("IMS token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IMS rejected the code exchange: {error}")]
    ServerResponse { error: String },

    #[error("IMS token response did not parse: {message}. Body: {body}")]
    Parse { message: String, body: String },

    #[error("IMS token exchange failed: {message}")]
    Other { message: String },
}

impl OauthError {
    pub fn flow(code: &'static str, message: impl Into<String>) -> Self {
        OauthError::Flow {
            code,
            message: message.into(),
        }
    }

    /// Identifier for the `error.code` field of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            OauthError::Flow { code, .. } => *code,
            _ => "OAUTH_EXCHANGE_FAILED",
        }
    }
}

const MAX_LOGGED_BODY_CHARS: usize = 100;

type ImsTokenError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<ImsTokenError> for OauthError {
    fn from(e: ImsTokenError) -> Self {
        match e {
            RequestTokenError::ServerResponse(resp) => OauthError::ServerResponse {
                error: resp.error().to_string(),
            },
            RequestTokenError::Request(HttpClientError::Reqwest(inner)) => {
                OauthError::Request(*inner)
            }
            RequestTokenError::Request(other) => OauthError::Other {
                message: other.to_string(),
            },
            RequestTokenError::Parse(parse_err, body) => {
                let body = String::from_utf8_lossy(&body);
                let body = match body.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
                    Some((idx, _)) => format!("{}...<truncated>", &body[..idx]),
                    None => body.into_owned(),
                };
                OauthError::Parse {
                    message: parse_err.to_string(),
                    body,
                }
            }
            RequestTokenError::Other(message) => OauthError::Other { message },
        }
    }
}

impl From<ImsTokenError> for ApertureError {
    fn from(e: ImsTokenError) -> Self {
        OauthError::from(e).into()
    }
}
