use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sync pipeline configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Cooldown between sync triggers from the same client.
    /// TOML: `sync.rate_limit_secs`. Default: `60`.
    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_secs: u64,

    /// Cooldown between admin login attempts from the same client.
    /// TOML: `sync.login_rate_limit_secs`. Default: `5`.
    #[serde(default = "default_login_rate_limit_secs")]
    pub login_rate_limit_secs: u64,

    /// Wall-clock limit for `POST /api/sync` runs.
    /// TOML: `sync.timeout_secs`. Default: `600`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Albums whose asset counts are fetched concurrently.
    /// TOML: `sync.asset_batch_size`. Default: `5`.
    #[serde(default = "default_asset_batch_size")]
    pub asset_batch_size: usize,

    /// Buffered progress frames per stream before intermediate frames are dropped.
    /// TOML: `sync.progress_buffer`. Default: `32`.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,

    /// Directory renditions are downloaded into. Unset keeps Lightroom rendition paths.
    /// TOML: `sync.media_dir`.
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    /// JSON file with gallery definitions imported at startup.
    /// TOML: `sync.galleries_file`.
    #[serde(default)]
    pub galleries_file: Option<PathBuf>,

    /// TOML: `sync.thumb_rendition`. Default: `thumbnail2x`.
    #[serde(default = "default_thumb_rendition")]
    pub thumb_rendition: String,

    /// TOML: `sync.medium_rendition`. Default: `1280`.
    #[serde(default = "default_medium_rendition")]
    pub medium_rendition: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rate_limit_secs: default_rate_limit_secs(),
            login_rate_limit_secs: default_login_rate_limit_secs(),
            timeout_secs: default_timeout_secs(),
            asset_batch_size: default_asset_batch_size(),
            progress_buffer: default_progress_buffer(),
            media_dir: None,
            galleries_file: None,
            thumb_rendition: default_thumb_rendition(),
            medium_rendition: default_medium_rendition(),
        }
    }
}

impl SyncConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_secs)
    }

    pub fn login_rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.login_rate_limit_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_rate_limit_secs() -> u64 {
    60
}

fn default_login_rate_limit_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_asset_batch_size() -> usize {
    5
}

fn default_progress_buffer() -> usize {
    32
}

fn default_thumb_rendition() -> String {
    "thumbnail2x".to_string()
}

fn default_medium_rendition() -> String {
    "1280".to_string()
}
