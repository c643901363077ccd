use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error as ThisError;

use super::IsRetryable;
use super::oauth::OauthError;

#[derive(Debug, ThisError)]
pub enum ApertureError {
    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Malformed upstream payload: {0}")]
    UpstreamPayload(String),

    #[error(transparent)]
    Oauth(#[from] OauthError),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("No Lightroom token stored; connect the account first")]
    NotAuthenticated,

    #[error("Lightroom access token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    #[error("Token cipher error: {0}")]
    Crypto(String),

    #[error("Gallery not found: {0}")]
    GalleryNotFound(String),

    #[error("Invalid gallery configuration for {id}: {reason}")]
    InvalidGallery { id: String, reason: String },

    #[error("Invalid gallery id")]
    InvalidGalleryId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A sync is already running")]
    SyncInProgress,

    #[error("Too many requests")]
    RateLimited,

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Sync timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl ApertureError {
    /// Client-safe description used in progress frames and generic failure bodies.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApertureError::NotAuthenticated => {
                "Lightroom is not connected. Sign in to Adobe and try again."
            }
            ApertureError::TokenExpired(_) => {
                "The Lightroom token has expired. Sign in to Adobe again."
            }
            ApertureError::GalleryNotFound(_) => "The requested gallery does not exist.",
            ApertureError::InvalidGallery { .. } => "A gallery is misconfigured.",
            ApertureError::InvalidGalleryId => "Invalid gallery id.",
            ApertureError::InvalidRequest(_) => "Invalid request.",
            ApertureError::SyncInProgress => "A sync is already running.",
            ApertureError::RateLimited => "Too many requests. Try again later.",
            ApertureError::Cancelled => "Sync cancelled.",
            ApertureError::Timeout(_) => "Sync timed out.",
            ApertureError::UpstreamStatus(_)
            | ApertureError::UpstreamPayload(_)
            | ApertureError::ReqwestError(_)
            | ApertureError::JsonError(_)
            | ApertureError::UrlError(_) => "Failed to fetch data from Lightroom.",
            ApertureError::Oauth(_) => "Adobe sign-in failed. Start the connection again.",
            ApertureError::IoError(_)
            | ApertureError::Crypto(_)
            | ApertureError::UnexpectedError(_)
            | ApertureError::RactorError(_)
            | ApertureError::DatabaseError(_) => "Sync failed.",
        }
    }
}

impl IntoResponse for ApertureError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            ApertureError::InvalidGalleryId
            | ApertureError::InvalidGallery { .. }
            | ApertureError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            ApertureError::GalleryNotFound(_) => (StatusCode::NOT_FOUND, "GALLERY_NOT_FOUND"),
            ApertureError::SyncInProgress => (StatusCode::CONFLICT, "SYNC_IN_PROGRESS"),
            ApertureError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            ApertureError::Oauth(e @ OauthError::Flow { .. }) => (StatusCode::FORBIDDEN, e.code()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ApiErrorObject {
            code: code.to_string(),
            message: self.public_message().to_string(),
            details: None,
        };
        (status, Json(ApiErrorBody { inner: body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for ApertureError {
    fn is_retryable(&self) -> bool {
        match self {
            ApertureError::ReqwestError(e) => !e.is_decode(),
            ApertureError::UpstreamStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}
