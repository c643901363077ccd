//! Write payloads accepted by the database actor.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::models::GalleryKind;
use crate::error::ApertureError;
use crate::utils::ident::validate_gallery_id;

/// Abstraction for writing a payload to the database.
///
/// Each payload owns its SQL so the actor only routes messages.
#[async_trait]
pub trait DbUpsert {
    type Output: Send;

    async fn upsert(self, pool: &SqlitePool) -> Result<Self::Output, ApertureError>;
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpsert {
    pub access_token: String,
    #[serde(default)]
    pub access_token_encrypted: bool,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenUpsert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenUpsert")
            .field("access_token_encrypted", &self.access_token_encrypted)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpsert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i64,
}

impl GalleryUpsert {
    /// Checks the id format and that the source fields required by `kind` are present.
    pub fn validate(&self) -> Result<(), ApertureError> {
        validate_gallery_id(&self.id)?;

        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let missing = match self.kind {
            GalleryKind::Private if !has(&self.album_id) => Some("private gallery needs albumId"),
            GalleryKind::Public if !has(&self.url) => Some("public gallery needs url"),
            _ => None,
        };

        match missing {
            Some(reason) => Err(ApertureError::InvalidGallery {
                id: self.id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumUpsert {
    /// Lightroom album id.
    pub id: String,
    pub gallery_id: String,
    /// Preferred slug; the actor suffixes it when another album already owns it.
    pub slug: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub cover_image: Option<String>,
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoUpsert {
    /// Lightroom asset id.
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
}

/// Album and its complete photo list, written in one transaction.
///
/// Photos of the album missing from `photos` are deleted.
#[derive(Debug, Clone)]
pub struct AlbumSync {
    pub album: AlbumUpsert,
    pub photos: Vec<PhotoUpsert>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSyncOutcome {
    pub album_id: String,
    pub slug: String,
    pub photos: u64,
    pub removed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterUpsert {
    pub id: String,
    pub album_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub photo_ids: Vec<String>,
    #[serde(default)]
    pub cover_photo_id: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gallery_upsert_reads_camel_case_json() {
        let g: GalleryUpsert = serde_json::from_value(json!({
            "id": "iceland-2023",
            "type": "private",
            "albumId": "a1b2",
            "albumName": "Iceland",
            "featured": true
        }))
        .unwrap();
        assert_eq!(g.kind, GalleryKind::Private);
        assert_eq!(g.album_id.as_deref(), Some("a1b2"));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn gallery_upsert_requires_source_fields() {
        let private = GalleryUpsert {
            id: "p".to_string(),
            kind: GalleryKind::Private,
            url: None,
            album_id: None,
            album_name: None,
            featured: false,
            sort_order: 0,
        };
        assert!(matches!(
            private.validate(),
            Err(ApertureError::InvalidGallery { .. })
        ));

        let public = GalleryUpsert {
            kind: GalleryKind::Public,
            url: Some("https://lightroom.adobe.com/shares/abc".to_string()),
            ..private
        };
        assert!(public.validate().is_ok());
    }

    #[test]
    fn gallery_upsert_rejects_bad_ids() {
        let g = GalleryUpsert {
            id: "../etc".to_string(),
            kind: GalleryKind::Public,
            url: Some("https://lightroom.adobe.com/shares/abc".to_string()),
            album_id: None,
            album_name: None,
            featured: false,
            sort_order: 0,
        };
        assert!(matches!(g.validate(), Err(ApertureError::InvalidGalleryId)));
    }
}
