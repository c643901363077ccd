use crate::server::router::AppState;
use crate::server::session::has_valid_session;
use crate::utils::secure::secure_compare;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use chrono::Utc;
use serde_json::json;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

fn extract_webhook_secret(headers: &HeaderMap) -> Option<String> {
    if let Some(secret) = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(secret.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

async fn session_is_valid(parts: &mut Parts, state: &AppState) -> bool {
    match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
        Ok(jar) => has_valid_session(&jar, state.session_ttl, Utc::now()),
        Err(_) => false,
    }
}

/// Sync trigger auth: a matching webhook secret or an admin session.
#[derive(Debug, Clone, Copy)]
pub struct RequireSyncAuth;

impl FromRequestParts<AppState> for RequireSyncAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = extract_webhook_secret(&parts.headers);

        if presented.is_some() {
            let expected = state.webhook_secret.as_deref();
            if secure_compare(presented.as_deref(), expected) {
                return Ok(RequireSyncAuth);
            }
        }

        if session_is_valid(parts, state).await {
            return Ok(RequireSyncAuth);
        }

        Err(match presented {
            Some(_) => AuthError::InvalidSecret,
            None => AuthError::MissingCredentials,
        })
    }
}

/// Admin-only routes: requires a live session cookie.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdminSession;

impl FromRequestParts<AppState> for RequireAdminSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if session_is_valid(parts, state).await {
            Ok(RequireAdminSession)
        } else {
            Err(AuthError::MissingCredentials)
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidSecret,
    InvalidPassword,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let reason = match self {
            AuthError::MissingCredentials => "Missing session or webhook secret",
            AuthError::InvalidSecret => "Invalid webhook secret",
            AuthError::InvalidPassword => "Invalid password",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": "UNAUTHORIZED", "message": reason } })),
        )
            .into_response()
    }
}
