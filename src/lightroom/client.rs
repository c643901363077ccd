use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use aperture_schema::lightroom::{Album, AlbumAsset, Catalog, Page};
use axum::body::Bytes;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::guard::parse_guarded_json;
use super::{ALBUM_PAGE_LIMIT, ASSET_PAGE_LIMIT, LIGHTROOM_USER_AGENT, X_API_KEY};
use crate::config::LightroomConfig;
use crate::error::ApertureError;
use crate::utils::logging::{body_preview, debug_pretty_json};

/// Album plus the number of assets it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumWithCount {
    #[serde(flatten)]
    pub album: Album,
    pub asset_count: u64,
}

/// Where a rendition is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionSource {
    /// Authenticated catalog (bearer token required).
    Catalog(String),
    /// Public shared space (API key only).
    Space(String),
}

/// Lightroom REST client.
///
/// Every request carries `X-API-Key`; catalog requests also carry the bearer token. Responses
/// may start with the `while (1) {}` guard, which is removed before parsing. Non-success
/// statuses are returned as [`ApertureError::UpstreamStatus`] without retrying.
#[derive(Clone)]
pub struct LightroomClient {
    http: reqwest::Client,
    api_url: Url,
    api_key: Arc<str>,
    limiter: Arc<DefaultDirectRateLimiter>,
    batch_size: usize,
}

impl LightroomClient {
    pub fn new(cfg: &LightroomConfig, http: reqwest::Client, batch_size: usize) -> Self {
        let mut api_url = cfg.api_url.clone();
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let tps = u32::try_from(cfg.request_tps.max(1)).unwrap_or(u32::MAX);
        let tps = NonZeroU32::new(tps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(tps)));

        Self {
            http,
            api_url,
            api_key: Arc::from(cfg.api_key.as_str()),
            limiter,
            batch_size: batch_size.max(1),
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// `GET v2/catalog`
    pub async fn fetch_catalog(&self, token: &str) -> Result<Catalog, ApertureError> {
        let url = self.api_url.join("v2/catalog")?;
        let catalog: Catalog = self.get_json(url, Some(token)).await?;
        debug_pretty_json(&catalog, |json| debug!(catalog = %json, "Lightroom catalog"));
        Ok(catalog)
    }

    /// All plain albums of the catalog, following pagination.
    pub async fn fetch_albums(
        &self,
        token: &str,
        catalog_id: &str,
    ) -> Result<Vec<Album>, ApertureError> {
        let mut url = self
            .api_url
            .join(&format!("v2/catalogs/{catalog_id}/albums"))?;
        url.query_pairs_mut()
            .append_pair("subtype", "collection")
            .append_pair("limit", &ALBUM_PAGE_LIMIT.to_string());
        self.get_all(url, Some(token)).await
    }

    /// Number of assets in one catalog album.
    pub async fn fetch_album_asset_count(
        &self,
        token: &str,
        catalog_id: &str,
        album_id: &str,
    ) -> Result<u64, ApertureError> {
        let url = self.album_assets_url(catalog_id, album_id, false)?;
        let assets: Vec<serde_json::Value> = self.get_all(url, Some(token)).await?;
        Ok(assets.len() as u64)
    }

    /// Albums with their asset counts, most recently updated first.
    ///
    /// Counts are fetched `batch_size` albums at a time; a failed count is logged and reported
    /// as zero.
    pub async fn fetch_albums_with_counts(
        &self,
        token: &str,
        catalog_id: &str,
    ) -> Result<Vec<AlbumWithCount>, ApertureError> {
        let albums = self.fetch_albums(token, catalog_id).await?;
        let mut out = Vec::with_capacity(albums.len());

        for batch in albums.chunks(self.batch_size) {
            let counts = join_all(
                batch
                    .iter()
                    .map(|album| self.fetch_album_asset_count(token, catalog_id, &album.id)),
            )
            .await;

            for (album, count) in batch.iter().zip(counts) {
                let asset_count = count.unwrap_or_else(|e| {
                    warn!(album_id = %album.id, error = %e, "Asset count failed, using 0");
                    0
                });
                out.push(AlbumWithCount {
                    album: album.clone(),
                    asset_count,
                });
            }
        }

        sort_by_updated_desc(&mut out);
        Ok(out)
    }

    /// Assets of a catalog album with the asset payload embedded, in album order.
    pub async fn fetch_album_assets(
        &self,
        token: &str,
        catalog_id: &str,
        album_id: &str,
    ) -> Result<Vec<AlbumAsset>, ApertureError> {
        let url = self.album_assets_url(catalog_id, album_id, true)?;
        self.get_all(url, Some(token)).await
    }

    /// Catalog album metadata.
    pub async fn fetch_album(
        &self,
        token: &str,
        catalog_id: &str,
        album_id: &str,
    ) -> Result<Album, ApertureError> {
        let url = self
            .api_url
            .join(&format!("v2/catalogs/{catalog_id}/albums/{album_id}"))?;
        self.get_json(url, Some(token)).await
    }

    pub async fn fetch_space_album(
        &self,
        space_id: &str,
        album_id: &str,
    ) -> Result<Album, ApertureError> {
        let url = self
            .api_url
            .join(&format!("v2/spaces/{space_id}/albums/{album_id}"))?;
        self.get_json(url, None).await
    }

    pub async fn fetch_space_albums(&self, space_id: &str) -> Result<Vec<Album>, ApertureError> {
        let mut url = self.api_url.join(&format!("v2/spaces/{space_id}/albums"))?;
        url.query_pairs_mut()
            .append_pair("limit", &ALBUM_PAGE_LIMIT.to_string());
        self.get_all(url, None).await
    }

    pub async fn fetch_space_assets(
        &self,
        space_id: &str,
        album_id: &str,
    ) -> Result<Vec<AlbumAsset>, ApertureError> {
        let mut url = self
            .api_url
            .join(&format!("v2/spaces/{space_id}/albums/{album_id}/assets"))?;
        url.query_pairs_mut()
            .append_pair("embed", "asset")
            .append_pair("limit", &ASSET_PAGE_LIMIT.to_string());
        self.get_all(url, None).await
    }

    pub fn rendition_url(
        &self,
        source: &RenditionSource,
        asset_id: &str,
        rendition: &str,
    ) -> Result<Url, ApertureError> {
        let path = match source {
            RenditionSource::Catalog(catalog_id) => {
                format!("v2/catalogs/{catalog_id}/assets/{asset_id}/renditions/{rendition}")
            }
            RenditionSource::Space(space_id) => {
                format!("v2/spaces/{space_id}/assets/{asset_id}/renditions/{rendition}")
            }
        };
        Ok(self.api_url.join(&path)?)
    }

    /// Raw rendition bytes. Server errors surface as retryable `UpstreamStatus`.
    pub async fn download_rendition(
        &self,
        source: &RenditionSource,
        asset_id: &str,
        rendition: &str,
        token: Option<&str>,
    ) -> Result<Bytes, ApertureError> {
        let url = self.rendition_url(source, asset_id, rendition)?;
        self.get_bytes(url, token).await
    }

    fn album_assets_url(
        &self,
        catalog_id: &str,
        album_id: &str,
        embed: bool,
    ) -> Result<Url, ApertureError> {
        let mut url = self
            .api_url
            .join(&format!("v2/catalogs/{catalog_id}/albums/{album_id}/assets"))?;
        {
            let mut query = url.query_pairs_mut();
            if embed {
                query.append_pair("embed", "asset");
            }
            query.append_pair("limit", &ASSET_PAGE_LIMIT.to_string());
        }
        Ok(url)
    }

    /// Collects `resources` across pages by following `links.next.href`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        first: Url,
        token: Option<&str>,
    ) -> Result<Vec<T>, ApertureError> {
        let mut resources = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(url.clone(), token).await?;

            let base = match page.base.as_deref() {
                Some(base) => Url::parse(base)?,
                None => url.clone(),
            };
            next = page
                .next_href()
                .map(|href| base.join(href))
                .transpose()?
                .filter(|candidate| *candidate != url);

            resources.extend(page.resources);
        }

        Ok(resources)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> Result<T, ApertureError> {
        let body = self.get_bytes(url.clone(), token).await?;
        parse_guarded_json(&body).inspect_err(|e| {
            warn!(url = %url, error = %e, body = %body_preview(&body), "Unparseable Lightroom response");
        })
    }

    async fn get_bytes(&self, url: Url, token: Option<&str>) -> Result<Bytes, ApertureError> {
        self.limiter.until_ready().await;

        let mut request = self
            .http
            .get(url.clone())
            .header(X_API_KEY, self.api_key.as_ref());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            warn!(
                %status,
                url = %url,
                body = %body_preview(&body),
                "Lightroom request failed"
            );
            return Err(ApertureError::UpstreamStatus(status));
        }

        debug!(%status, url = %url, bytes = body.len(), "Lightroom response");
        Ok(body)
    }
}

/// Stable sort by `updated`, newest first; albums without a timestamp go last.
fn sort_by_updated_desc(albums: &mut [AlbumWithCount]) {
    albums.sort_by(|a, b| b.album.updated.cmp(&a.album.updated));
}

/// Shared outbound client for Lightroom and IMS calls.
pub fn build_http_client(cfg: &LightroomConfig) -> Result<reqwest::Client, ApertureError> {
    let mut headers = HeaderMap::new();

    let mut builder = reqwest::Client::builder()
        .user_agent(LIGHTROOM_USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(2 * 60));

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if !cfg.enable_multiplexing {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    } else {
        builder = builder.http2_adaptive_window(true);
    }

    Ok(builder.default_headers(headers).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn album(id: &str, updated: Option<i64>) -> AlbumWithCount {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": id,
            "payload": { "name": id }
        }))
        .unwrap();
        AlbumWithCount {
            album: Album {
                updated: updated.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
                ..album
            },
            asset_count: 0,
        }
    }

    #[test]
    fn sorts_newest_first_and_keeps_ties_stable() {
        let mut albums = vec![
            album("a", Some(200)),
            album("b", Some(100)),
            album("none", None),
            album("c", Some(300)),
            album("b2", Some(100)),
        ];
        sort_by_updated_desc(&mut albums);
        let ids: Vec<&str> = albums.iter().map(|a| a.album.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b", "b2", "none"]);
    }

    #[test]
    fn api_url_gets_trailing_slash() {
        let cfg = LightroomConfig {
            api_url: Url::parse("http://127.0.0.1:9/lr").unwrap(),
            ..LightroomConfig::default()
        };
        let client = LightroomClient::new(&cfg, reqwest::Client::new(), 5);
        assert_eq!(client.api_url().as_str(), "http://127.0.0.1:9/lr/");
        let url = client
            .rendition_url(&RenditionSource::Space("s1".into()), "a1", "thumbnail2x")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9/lr/v2/spaces/s1/assets/a1/renditions/thumbnail2x"
        );
    }
}
