use crate::config::{Config, LightroomConfig};
use crate::db::DbActorHandle;
use crate::error::ApertureError;
use crate::lightroom::{LightroomClient, TokenCipher, build_http_client};
use crate::server::guards::auth::RequireAdminSession;
use crate::server::rate_limit::{ClientRateLimiter, DEFAULT_MAX_CLIENTS};
use crate::server::routes;
use crate::sync::SyncService;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn http_version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

/// Cookie key derived from `basic.session_secret`; stable across restarts.
pub fn derive_cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// Independent cooldowns for the sync, stream and login endpoints.
#[derive(Clone, Debug)]
pub struct Limiters {
    pub sync: ClientRateLimiter,
    pub stream: ClientRateLimiter,
    pub login: ClientRateLimiter,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbActorHandle,
    pub sync: SyncService,
    pub lightroom: LightroomClient,
    /// Outbound client shared by the Lightroom API and the IMS token exchange.
    pub http: reqwest::Client,
    pub cipher: TokenCipher,
    pub lightroom_cfg: Arc<LightroomConfig>,
    pub limiters: Limiters,
    pub admin_password: Arc<str>,
    pub webhook_secret: Option<Arc<str>>,
    pub cookie_key: Key,
    pub session_ttl: chrono::Duration,
    pub insecure_cookie: bool,
    pub sync_timeout: Duration,
    pub progress_buffer: usize,
}

impl AppState {
    pub fn new(db: DbActorHandle, cfg: &Config) -> Result<Self, ApertureError> {
        let http = build_http_client(&cfg.lightroom)?;
        let lightroom =
            LightroomClient::new(&cfg.lightroom, http.clone(), cfg.sync.asset_batch_size);
        let cipher = TokenCipher::from_secret(&cfg.lightroom.token_encryption_key);
        let sync =
            SyncService::from_config(db.clone(), lightroom.clone(), cipher.clone(), &cfg.sync);

        let session_hours = cfg.basic.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS) as i64;

        Ok(Self {
            db,
            sync,
            lightroom,
            http,
            cipher,
            lightroom_cfg: Arc::new(cfg.lightroom.clone()),
            limiters: Limiters {
                sync: ClientRateLimiter::new(cfg.sync.rate_limit_window(), DEFAULT_MAX_CLIENTS),
                stream: ClientRateLimiter::new(cfg.sync.rate_limit_window(), DEFAULT_MAX_CLIENTS),
                login: ClientRateLimiter::new(
                    cfg.sync.login_rate_limit_window(),
                    DEFAULT_MAX_CLIENTS,
                ),
            },
            admin_password: Arc::from(cfg.basic.admin_password.as_str()),
            webhook_secret: cfg.basic.webhook_secret().map(Arc::from),
            cookie_key: derive_cookie_key(&cfg.basic.session_secret),
            session_ttl: chrono::Duration::hours(session_hours),
            insecure_cookie: cfg.basic.insecure_cookie,
            sync_timeout: cfg.sync.timeout(),
            progress_buffer: cfg.sync.progress_buffer,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let protocol = http_version_label(req.version());

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status().as_u16();
    // For SSE responses this is time to first byte.
    let latency_ms = start.elapsed().as_millis() as u64;

    if resp.status().is_server_error() {
        error!(status, %request_id, %method, protocol, %path, latency_ms, %user_agent, "request");
    } else if resp.status().is_client_error() {
        warn!(status, %request_id, %method, protocol, %path, latency_ms, %user_agent, "request");
    } else {
        info!(status, %request_id, %method, protocol, %path, latency_ms, %user_agent, "request");
    }

    resp
}

pub fn aperture_router(state: AppState) -> Router {
    let admin = Router::new()
        .merge(routes::galleries::router())
        .merge(routes::lightroom::router())
        .route_layer(middleware::from_extractor_with_state::<RequireAdminSession, _>(
            state.clone(),
        ));

    Router::new()
        .merge(routes::sync::router())
        .merge(routes::auth::router())
        .merge(admin)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
