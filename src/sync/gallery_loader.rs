//! Startup import of gallery definitions (and optionally a token) from a JSON file.
//!
//! Accepted shapes:
//! - `[ { "id": ..., "type": "private" | "public", ... }, ... ]`
//! - `{ "galleries": [ ... ], "token": { "accessToken": ..., "expiresAt": ... } }`

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::{DbActorHandle, GalleryUpsert};
use crate::error::ApertureError;
use crate::lightroom::TokenCipher;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSeed {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSeed")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct GallerySeed {
    pub galleries: Vec<GalleryUpsert>,
    pub token: Option<TokenSeed>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        galleries: Vec<Value>,
        #[serde(default)]
        token: Option<Value>,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub galleries: usize,
    pub token: bool,
}

/// Reads the seed file. A missing file yields an empty seed.
pub fn load_from_file(path: &Path) -> Result<GallerySeed, ApertureError> {
    if !path.is_file() {
        info!(path = %path.display(), "galleries file not found; skipping import");
        return Ok(GallerySeed::default());
    }
    let contents = std::fs::read_to_string(path)?;
    parse_seed(path, &contents)
}

/// Parses seed JSON; malformed gallery entries are logged and skipped.
pub fn parse_seed(path: &Path, contents: &str) -> Result<GallerySeed, ApertureError> {
    let (entries, token) = match serde_json::from_str::<SeedFile>(contents)? {
        SeedFile::Bare(entries) => (entries, None),
        SeedFile::Wrapped { galleries, token } => (galleries, token),
    };

    let galleries = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            match serde_json::from_value::<GalleryUpsert>(value)
                .map_err(ApertureError::from)
                .and_then(|g| g.validate().map(|_| g))
            {
                Ok(g) => Some(g),
                Err(e) => {
                    warn!(path = %path.display(), index, error = %e, "skipping invalid gallery entry");
                    None
                }
            }
        })
        .collect();

    let token = token.and_then(|value| match serde_json::from_value::<TokenSeed>(value) {
        Ok(seed) => Some(seed),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping invalid token entry");
            None
        }
    });

    Ok(GallerySeed { galleries, token })
}

/// Writes the seed into the database. The token is sealed with `cipher` first.
pub async fn apply(
    db: &DbActorHandle,
    cipher: &TokenCipher,
    seed: GallerySeed,
) -> Result<SeedReport, ApertureError> {
    let mut report = SeedReport::default();

    for gallery in seed.galleries {
        let id = gallery.id.clone();
        match db.upsert_gallery(gallery).await {
            Ok(()) => report.galleries += 1,
            Err(e) => warn!(gallery_id = %id, error = %e, "failed to import gallery"),
        }
    }

    if let Some(token) = seed.token {
        let row = cipher.token_upsert(
            &token.access_token,
            token.refresh_token.as_deref(),
            token.expires_at,
        )?;
        db.upsert_token(row).await?;
        report.token = true;
    }

    info!(
        galleries = report.galleries,
        token = report.token,
        "gallery import finished"
    );
    Ok(report)
}
