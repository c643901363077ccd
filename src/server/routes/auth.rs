use crate::error::{ApertureError, OauthError};
use crate::lightroom::oauth::{AdobeOauthEndpoints, stored_token};
use crate::server::guards::auth::{AuthError, RequireAdminSession};
use crate::server::guards::throttle::{LoginEndpoint, Throttle};
use crate::server::router::AppState;
use crate::server::session::{clear_session, session_cookie};
use crate::utils::secure::secure_compare;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use oauth2::AuthorizationCode;
use serde::Deserialize;
use serde_json::json;
use time::Duration;
use tracing::{error, info, warn};

const CSRF_COOKIE: &str = "aperture_adobe_csrf";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdobeCallbackQuery {
    pub code: String,
    pub state: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/adobe", get(adobe_oauth_entry))
        .route("/api/auth/adobe/callback", get(adobe_oauth_callback))
}

/// POST /api/auth/login
async fn login(
    _throttle: Throttle<LoginEndpoint>,
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if !secure_compare(Some(body.password.as_str()), Some(&*state.admin_password)) {
        warn!("admin login rejected");
        return Err(AuthError::InvalidPassword);
    }

    info!("admin session issued");
    let cookie = session_cookie(Utc::now(), state.session_ttl, state.insecure_cookie);
    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}

/// POST /api/auth/logout
async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (clear_session(jar), StatusCode::NO_CONTENT)
}

/// GET /api/auth/adobe
///
/// Redirects the admin's browser to Adobe IMS to connect the Lightroom account.
async fn adobe_oauth_entry(
    _admin: RequireAdminSession,
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, ApertureError> {
    let (auth_url, csrf_token) = AdobeOauthEndpoints::build_authorize_url(&state.lightroom_cfg)?;
    let jar = jar.add(build_cookie(
        CSRF_COOKIE,
        csrf_token.secret().to_string(),
        state.insecure_cookie,
    ));

    info!(authorize_url = %auth_url.origin().ascii_serialization(), "Dispatching Adobe OAuth redirect");
    Ok((jar, Redirect::temporary(auth_url.as_ref())))
}

/// GET /api/auth/adobe/callback
///
/// Session cookies are `SameSite=Strict` and absent on the cross-site return from IMS; the
/// CSRF cookie authenticates this leg instead.
async fn adobe_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<AdobeCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (jar, csrf) = take_csrf_cookie(jar);

    match process_oauth_exchange(&state, &query, csrf.as_deref()).await {
        Ok(expires_at) => {
            info!(%expires_at, "Adobe OAuth callback accepted");
            (
                jar,
                (
                    StatusCode::OK,
                    Json(json!({ "connected": true, "expiresAt": expires_at })),
                ),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "Adobe OAuth failure");
            (jar, err.into_response()).into_response()
        }
    }
}

async fn process_oauth_exchange(
    state: &AppState,
    query: &AdobeCallbackQuery,
    csrf: Option<&str>,
) -> Result<chrono::DateTime<Utc>, ApertureError> {
    if csrf.is_none() {
        return Err(OauthError::flow("OAUTH_SESSION_MISSING", "Missing OAuth session cookie").into());
    }
    if !secure_compare(Some(query.state.as_str()), csrf) {
        return Err(OauthError::flow("CSRF_MISMATCH", "CSRF token mismatch").into());
    }

    let token = AdobeOauthEndpoints::exchange_authorization_code(
        &state.lightroom_cfg,
        AuthorizationCode::new(query.code.clone()),
        &state.http,
    )
    .await?;

    let row = stored_token(&token, &state.cipher, Utc::now())?;
    let expires_at = row.expires_at;
    state.db.upsert_token(row).await?;
    Ok(expires_at)
}

fn take_csrf_cookie(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    let csrf = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(CSRF_COOKIE).path("/"));
    (jar, csrf)
}

fn build_cookie(name: &'static str, value: String, insecure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}
