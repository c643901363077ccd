use std::path::PathBuf;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApertureError, IsRetryable};
use crate::lightroom::{LightroomClient, RenditionSource};
use crate::utils::ident::is_path_segment;

/// Public URL prefix under which the media directory is served.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Local copy of Lightroom renditions: `<root>/<album id>/<asset id>-<rendition>.jpg`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    retry_policy: ExponentialBuilder,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retry_policy: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(200))
                .with_max_delay(Duration::from_secs(2))
                .with_max_times(3)
                .with_jitter(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Downloads a rendition unless it is already on disk; returns its public path.
    pub async fn ensure_rendition(
        &self,
        client: &LightroomClient,
        source: &RenditionSource,
        album_id: &str,
        asset_id: &str,
        rendition: &str,
        token: Option<&str>,
    ) -> Result<String, ApertureError> {
        for segment in [album_id, asset_id, rendition] {
            if !is_path_segment(segment) {
                return Err(ApertureError::UpstreamPayload(format!(
                    "unsafe path segment from Lightroom: {segment:?}"
                )));
            }
        }

        let file_name = format!("{asset_id}-{rendition}.jpg");
        let public_path = format!("{MEDIA_URL_PREFIX}/{album_id}/{file_name}");
        let dir = self.root.join(album_id);
        let target = dir.join(&file_name);

        if fs::try_exists(&target).await? {
            debug!(path = %target.display(), "rendition already on disk");
            return Ok(public_path);
        }
        fs::create_dir_all(&dir).await?;

        let bytes = (|| client.download_rendition(source, asset_id, rendition, token))
            .retry(self.retry_policy)
            .when(|err: &ApertureError| err.is_retryable())
            .notify(|err: &ApertureError, dur: Duration| {
                warn!(asset_id, rendition, error = %err, "rendition download failed, retry after {:?}", dur);
            })
            .await?;

        let tmp = dir.join(format!(".{file_name}.{}.part", Uuid::new_v4().simple()));
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %target.display(), bytes = bytes.len(), "rendition stored");
        Ok(public_path)
    }
}
