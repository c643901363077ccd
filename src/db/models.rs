use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Fixed primary key of the singleton Lightroom token row.
pub const LIGHTROOM_TOKEN_ID: &str = "lightroom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GalleryKind {
    /// Album in the authenticated account's catalog.
    Private,
    /// Publicly shared Lightroom album, readable with the API key only.
    Public,
}

#[derive(Clone, PartialEq, FromRow)]
pub struct DbStoredToken {
    pub id: String,
    pub access_token: String,
    pub access_token_encrypted: bool,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for DbStoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbStoredToken")
            .field("id", &self.id)
            .field("access_token", &"<redacted>")
            .field("access_token_encrypted", &self.access_token_encrypted)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbGallery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
    pub url: Option<String>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub featured: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbGallery {
    /// Human readable label for progress frames.
    pub fn display_name(&self) -> &str {
        self.album_name.as_deref().unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbAlbum {
    pub id: String,
    pub gallery_id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub cover_image: Option<String>,
    pub featured: bool,
    pub photo_count: i64,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbPhoto {
    pub album_id: String,
    pub id: String,
    pub title: String,
    pub sort_order: i64,
    pub thumb_path: String,
    pub medium_path: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbChapter {
    pub id: String,
    pub album_id: String,
    pub title: String,
    pub content: Option<String>,
    pub photo_ids: Json<Vec<String>>,
    pub cover_photo_id: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub last_updated: Option<DateTime<Utc>>,
    pub album_count: i64,
    pub photo_count: i64,
}
