use std::future::Future;
use std::sync::Arc;

use aperture_schema::lightroom::{Album, AlbumAsset};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::mapping::{album_date, is_image, map_asset, order_assets, parse_share_url, photo_title, slugify};
use super::media::MediaStore;
use super::progress::{ProgressSender, SyncPhase, SyncProgress};
use super::registry::{RunGuard, RunRegistry};
use crate::config::SyncConfig;
use crate::db::{
    AlbumSync, AlbumSyncOutcome, AlbumUpsert, DbActorHandle, DbGallery, GalleryKind, PhotoUpsert,
};
use crate::error::ApertureError;
use crate::lightroom::{LightroomClient, RenditionSource, TokenCipher, usable_access_token};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub albums: u64,
    pub photos: u64,
}

/// Rendition names used for the stored thumbnail and medium paths.
#[derive(Debug, Clone)]
pub struct Renditions {
    pub thumb: String,
    pub medium: String,
}

impl Default for Renditions {
    fn default() -> Self {
        let cfg = SyncConfig::default();
        Self {
            thumb: cfg.thumb_rendition,
            medium: cfg.medium_rendition,
        }
    }
}

/// Credentials for catalog (private) galleries, resolved once per run.
struct CatalogAccess {
    token: String,
    catalog_id: String,
}

/// Remote side of one gallery, fetched before any write.
struct RemoteGallery {
    album: Album,
    assets: Vec<AlbumAsset>,
    source: RenditionSource,
}

/// Runs Lightroom → database syncs, one at a time.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    db: DbActorHandle,
    client: LightroomClient,
    cipher: TokenCipher,
    registry: RunRegistry,
    media: Option<MediaStore>,
    renditions: Renditions,
}

impl SyncService {
    pub fn new(
        db: DbActorHandle,
        client: LightroomClient,
        cipher: TokenCipher,
        registry: RunRegistry,
        media: Option<MediaStore>,
        renditions: Renditions,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                db,
                client,
                cipher,
                registry,
                media,
                renditions,
            }),
        }
    }

    pub fn from_config(
        db: DbActorHandle,
        client: LightroomClient,
        cipher: TokenCipher,
        cfg: &SyncConfig,
    ) -> Self {
        Self::new(
            db,
            client,
            cipher,
            RunRegistry::new(),
            cfg.media_dir.clone().map(MediaStore::new),
            Renditions {
                thumb: cfg.thumb_rendition.clone(),
                medium: cfg.medium_rendition.clone(),
            },
        )
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.inner.registry
    }

    pub fn is_running(&self) -> bool {
        self.inner.registry.is_running()
    }

    /// Claims the single run slot without starting work.
    pub fn begin(&self) -> Result<RunGuard, ApertureError> {
        self.inner.registry.try_begin()
    }

    /// Claims the run slot and syncs `gallery_id`, or every gallery when `None`.
    pub async fn run_sync(
        &self,
        gallery_id: Option<&str>,
        progress: &ProgressSender,
    ) -> Result<SyncSummary, ApertureError> {
        let guard = self.begin()?;
        self.run_with_guard(guard, gallery_id, progress).await
    }

    /// Runs a sync under an already claimed slot.
    ///
    /// The slot is released before the terminal frame is sent. Failures are logged in full and
    /// reported to `progress` with their public message only.
    pub async fn run_with_guard(
        &self,
        guard: RunGuard,
        gallery_id: Option<&str>,
        progress: &ProgressSender,
    ) -> Result<SyncSummary, ApertureError> {
        let run_id = guard.id();
        let cancel = guard.cancel_token();
        let mut state = SyncProgress::pending();

        let result = self
            .execute(gallery_id, &cancel, &mut state, progress)
            .await;
        drop(guard);

        match result {
            Ok(summary) => {
                info!(
                    %run_id,
                    albums = summary.albums,
                    photos = summary.photos,
                    "sync completed"
                );
                state.complete(summary.albums, summary.photos);
                progress.finish(state).await;
                Ok(summary)
            }
            Err(e) => {
                match &e {
                    ApertureError::Cancelled => warn!(%run_id, "sync cancelled"),
                    other => error!(%run_id, error = %other, "sync failed"),
                }
                state.fail(e.public_message());
                progress.finish(state).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        gallery_id: Option<&str>,
        cancel: &CancellationToken,
        state: &mut SyncProgress,
        progress: &ProgressSender,
    ) -> Result<SyncSummary, ApertureError> {
        let db = &self.inner.db;

        state.step(SyncPhase::Starting, "Loading galleries");
        progress.report(state);

        let galleries = match gallery_id {
            Some(id) => vec![
                db.get_gallery(id)
                    .await?
                    .ok_or_else(|| ApertureError::GalleryNotFound(id.to_string()))?,
            ],
            None => db.list_galleries().await?,
        };
        state.total_galleries = galleries.len();
        ensure_active(cancel)?;

        let catalog = if galleries.iter().any(|g| g.kind == GalleryKind::Private) {
            state.step(SyncPhase::Authenticating, "Checking Lightroom authentication");
            progress.report(state);
            Some(self.catalog_access(cancel).await?)
        } else {
            None
        };

        let mut summary = SyncSummary::default();
        for (index, gallery) in galleries.iter().enumerate() {
            ensure_active(cancel)?;
            state.enter_gallery(index, gallery.display_name());
            progress.report(state);

            let outcome = self
                .sync_gallery(gallery, catalog.as_ref(), cancel, state, progress)
                .await?;
            summary.albums += 1;
            summary.photos += outcome.photos;
        }

        Ok(summary)
    }

    async fn catalog_access(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CatalogAccess, ApertureError> {
        let stored = self.inner.db.get_token().await?;
        let token = usable_access_token(stored, &self.inner.cipher, Utc::now())?;
        let catalog = cancellable(cancel, self.inner.client.fetch_catalog(&token)).await?;
        Ok(CatalogAccess {
            token,
            catalog_id: catalog.id,
        })
    }

    async fn sync_gallery(
        &self,
        gallery: &DbGallery,
        catalog: Option<&CatalogAccess>,
        cancel: &CancellationToken,
        state: &mut SyncProgress,
        progress: &ProgressSender,
    ) -> Result<AlbumSyncOutcome, ApertureError> {
        let remote = self.fetch_remote(gallery, catalog, cancel).await?;
        let token = match remote.source {
            RenditionSource::Catalog(_) => catalog.map(|c| c.token.as_str()),
            RenditionSource::Space(_) => None,
        };

        let images: Vec<AlbumAsset> = remote.assets.into_iter().filter(is_image).collect();
        let chapters = self.inner.db.list_chapters(&remote.album.id).await?;
        let ordered = order_assets(images, &chapters);

        state.photos_found(ordered.len());
        progress.report(state);

        let mut photos: Vec<PhotoUpsert> = Vec::with_capacity(ordered.len());
        for (index, resource) in ordered.iter().enumerate() {
            ensure_active(cancel)?;
            state.photo_started(&photo_title(resource));
            progress.report(state);

            let (thumb, medium) = self
                .rendition_paths(&remote.source, &remote.album.id, resource.asset_id(), token, cancel)
                .await?;
            photos.push(map_asset(resource, index as i64, thumb, medium));

            state.photo_finished();
            progress.report(state);
        }

        ensure_active(cancel)?;
        state.step(SyncPhase::Saving, format!("Saving {} photos", photos.len()));
        progress.report(state);

        let title = gallery
            .album_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(Some(remote.album.name().trim()).filter(|s| !s.is_empty()))
            .unwrap_or(gallery.id.as_str())
            .to_string();

        let cover_image = remote
            .album
            .cover_asset_id()
            .and_then(|cover| photos.iter().find(|p| p.id == cover))
            .or(photos.first())
            .map(|p| p.medium_path.clone());

        let album = AlbumUpsert {
            id: remote.album.id.clone(),
            gallery_id: gallery.id.clone(),
            slug: slugify(&title),
            title,
            date: album_date(&photos),
            cover_image,
            featured: gallery.featured,
        };

        let outcome = self.inner.db.sync_album(AlbumSync { album, photos }).await?;
        info!(
            gallery_id = %gallery.id,
            album_id = %outcome.album_id,
            slug = %outcome.slug,
            photos = outcome.photos,
            removed = outcome.removed,
            "gallery synced"
        );
        Ok(outcome)
    }

    async fn fetch_remote(
        &self,
        gallery: &DbGallery,
        catalog: Option<&CatalogAccess>,
        cancel: &CancellationToken,
    ) -> Result<RemoteGallery, ApertureError> {
        let client = &self.inner.client;
        let invalid = |reason: &str| ApertureError::InvalidGallery {
            id: gallery.id.clone(),
            reason: reason.to_string(),
        };

        match gallery.kind {
            GalleryKind::Private => {
                let access = catalog.ok_or_else(|| {
                    ApertureError::UnexpectedError("catalog access not resolved".to_string())
                })?;
                let album_id = non_empty(gallery.album_id.as_deref())
                    .ok_or_else(|| invalid("private gallery needs albumId"))?;

                ensure_active(cancel)?;
                let album = cancellable(
                    cancel,
                    client.fetch_album(&access.token, &access.catalog_id, album_id),
                )
                .await?;
                ensure_active(cancel)?;
                let assets = cancellable(
                    cancel,
                    client.fetch_album_assets(&access.token, &access.catalog_id, album_id),
                )
                .await?;

                Ok(RemoteGallery {
                    album,
                    assets,
                    source: RenditionSource::Catalog(access.catalog_id.clone()),
                })
            }
            GalleryKind::Public => {
                let url = non_empty(gallery.url.as_deref())
                    .ok_or_else(|| invalid("public gallery needs url"))?;
                let (space_id, url_album) =
                    parse_share_url(url).ok_or_else(|| invalid("unrecognized share url"))?;
                let album_id = non_empty(gallery.album_id.as_deref())
                    .map(str::to_string)
                    .or(url_album);

                ensure_active(cancel)?;
                let album = match album_id {
                    Some(album_id) => {
                        cancellable(cancel, client.fetch_space_album(&space_id, &album_id)).await?
                    }
                    None => cancellable(cancel, client.fetch_space_albums(&space_id))
                        .await?
                        .into_iter()
                        .next()
                        .ok_or_else(|| {
                            ApertureError::UpstreamPayload(format!(
                                "shared space {space_id} has no albums"
                            ))
                        })?,
                };
                ensure_active(cancel)?;
                let assets =
                    cancellable(cancel, client.fetch_space_assets(&space_id, &album.id)).await?;

                Ok(RemoteGallery {
                    album,
                    assets,
                    source: RenditionSource::Space(space_id),
                })
            }
        }
    }

    async fn rendition_paths(
        &self,
        source: &RenditionSource,
        album_id: &str,
        asset_id: &str,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(String, String), ApertureError> {
        let inner = &self.inner;
        let renditions = [inner.renditions.thumb.as_str(), inner.renditions.medium.as_str()];

        let mut paths = Vec::with_capacity(renditions.len());
        for rendition in renditions {
            let path = match &inner.media {
                Some(store) => {
                    ensure_active(cancel)?;
                    cancellable(
                        cancel,
                        store.ensure_rendition(
                            &inner.client, source, album_id, asset_id, rendition, token,
                        ),
                    )
                    .await?
                }
                None => inner
                    .client
                    .rendition_url(source, asset_id, rendition)?
                    .to_string(),
            };
            paths.push(path);
        }

        let medium = paths.pop().unwrap_or_default();
        let thumb = paths.pop().unwrap_or_default();
        Ok((thumb, medium))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), ApertureError> {
    if cancel.is_cancelled() {
        Err(ApertureError::Cancelled)
    } else {
        Ok(())
    }
}

/// Races `fut` against cancellation so an in-flight request is abandoned promptly.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ApertureError>
where
    F: Future<Output = Result<T, ApertureError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApertureError::Cancelled),
        result = fut => result,
    }
}
