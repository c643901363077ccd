use crate::error::ApertureError;
use crate::lightroom::usable_access_token;
use crate::server::router::AppState;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::Utc;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/lightroom/albums", get(list_albums))
}

/// GET /api/lightroom/albums
///
/// Catalog albums with asset counts, newest first; used by the admin UI to pick gallery sources.
async fn list_albums(State(state): State<AppState>) -> Result<impl IntoResponse, ApertureError> {
    let token = usable_access_token(state.db.get_token().await?, &state.cipher, Utc::now())?;
    let catalog = state.lightroom.fetch_catalog(&token).await?;
    let albums = state
        .lightroom
        .fetch_albums_with_counts(&token, &catalog.id)
        .await?;
    Ok(Json(albums))
}
