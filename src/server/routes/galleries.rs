use crate::db::GalleryUpsert;
use crate::error::ApertureError;
use crate::server::router::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/galleries", get(list_galleries).post(replace_galleries))
}

/// GET /api/galleries
async fn list_galleries(State(state): State<AppState>) -> Result<impl IntoResponse, ApertureError> {
    Ok(Json(state.db.list_galleries().await?))
}

/// POST /api/galleries
///
/// Upserts every gallery in the array. Nothing is written unless all entries validate.
async fn replace_galleries(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApertureError> {
    let galleries: Vec<GalleryUpsert> = serde_json::from_slice(&body)
        .map_err(|e| ApertureError::InvalidRequest(format!("invalid gallery list: {e}")))?;
    for gallery in &galleries {
        gallery.validate()?;
    }

    let accepted = galleries.len();
    for gallery in galleries {
        state.db.upsert_gallery(gallery).await?;
    }

    info!(accepted, "galleries upserted");
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": accepted }))))
}
