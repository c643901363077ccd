use crate::error::ApertureError;
use crate::server::guards::auth::RequireSyncAuth;
use crate::server::guards::throttle::{StreamEndpoint, SyncEndpoint, Throttle};
use crate::server::router::AppState;
use crate::sync::ProgressSender;
use crate::utils::ident::validate_gallery_id;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    handler::Handler,
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub gallery_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub albums: u64,
    pub photos: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery_id: Option<String>,
    pub message: String,
}

/// Empty or whitespace-only bodies mean "all galleries".
pub fn parse_sync_request(body: &[u8]) -> Result<SyncRequest, ApertureError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SyncRequest::default());
    }
    let request: SyncRequest = serde_json::from_slice(body)
        .map_err(|e| ApertureError::InvalidRequest(format!("invalid sync body: {e}")))?;
    if let Some(id) = request.gallery_id.as_deref() {
        validate_gallery_id(id)?;
    }
    Ok(request)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sync", get(sync_stats).post(sync_now))
        .route(
            "/api/sync/stream",
            get(stream_status).post(sync_stream.layer(SetResponseHeaderLayer::overriding(
                X_ACCEL_BUFFERING,
                HeaderValue::from_static("no"),
            ))),
        )
}

/// GET /api/sync
async fn sync_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApertureError> {
    Ok(Json(state.db.stats().await?))
}

/// POST /api/sync
///
/// Runs a sync to completion under `sync.timeout_secs`.
async fn sync_now(
    _throttle: Throttle<SyncEndpoint>,
    _auth: RequireSyncAuth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApertureError> {
    let request = parse_sync_request(&body)?;
    let guard = state.sync.begin()?;

    info!(gallery_id = ?request.gallery_id, "sync requested");
    let progress = ProgressSender::detached();
    let run = state
        .sync
        .run_with_guard(guard, request.gallery_id.as_deref(), &progress);
    let summary = tokio::time::timeout(state.sync_timeout, run)
        .await
        .map_err(|_| ApertureError::Timeout(state.sync_timeout))??;

    Ok(Json(SyncResponse {
        success: true,
        albums: summary.albums,
        photos: summary.photos,
        message: format!(
            "Synced {} albums with {} photos",
            summary.albums, summary.photos
        ),
        gallery_id: request.gallery_id,
    }))
}

/// POST /api/sync/stream
///
/// Streams progress frames as server-sent events. Dropping the response cancels the run.
async fn sync_stream(
    _throttle: Throttle<StreamEndpoint>,
    _auth: RequireSyncAuth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApertureError> {
    let request = parse_sync_request(&body)?;
    let guard = state.sync.begin()?;
    let cancel_on_disconnect = guard.cancel_token().drop_guard();

    info!(gallery_id = ?request.gallery_id, "streaming sync requested");
    let (progress, rx) = ProgressSender::channel(state.progress_buffer);
    let sync = state.sync.clone();
    tokio::spawn(async move {
        // Outcome is already logged and reported as the terminal frame.
        let _ = sync
            .run_with_guard(guard, request.gallery_id.as_deref(), &progress)
            .await;
    });

    let stream = ReceiverStream::new(rx).map(move |frame| {
        let _held = &cancel_on_disconnect;
        Event::default().json_data(&frame)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// GET /api/sync/stream
///
/// `startedAt` is null while idle.
async fn stream_status(_auth: RequireSyncAuth, State(state): State<AppState>) -> impl IntoResponse {
    let started_at = state.sync.registry().started_at();
    Json(json!({ "syncing": started_at.is_some(), "startedAt": started_at }))
}
