use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub id: String,

    /// `collection` for plain albums, `collection_set` for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub payload: AlbumPayload,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlbumPayload {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<AlbumCover>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumCover {
    pub id: String,
}

impl Album {
    pub fn name(&self) -> &str {
        self.payload.name.as_str()
    }

    pub fn cover_asset_id(&self) -> Option<&str> {
        self.payload.cover.as_ref().map(|c| c.id.as_str())
    }
}
