//! Pure conversions from Lightroom resources to database payloads.

use ahash::{AHashMap, AHashSet};
use aperture_schema::lightroom::{AlbumAsset, AssetPayload};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use url::Url;

use crate::db::{DbChapter, PhotoUpsert};

/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "album".to_string()
    } else {
        slug
    }
}

/// Space id and optional album id of a Lightroom share link
/// (`.../shares/<space>[/albums/<album>]`).
pub fn parse_share_url(raw: &str) -> Option<(String, Option<String>)> {
    let url = Url::parse(raw.trim()).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    segments.find(|s| *s == "shares")?;
    let space = segments.next()?.to_string();
    let album = match segments.next() {
        Some("albums") => segments.next().map(str::to_string),
        _ => None,
    };
    Some((space, album))
}

pub fn is_image(resource: &AlbumAsset) -> bool {
    resource
        .asset
        .as_ref()
        .and_then(|a| a.subtype.as_deref())
        .is_none_or(|subtype| subtype == "image")
}

/// Display title: XMP title, then file name without extension, then the asset id.
pub fn photo_title(resource: &AlbumAsset) -> String {
    let payload = resource.asset.as_ref().map(|a| &a.payload);
    let xmp_title = payload
        .and_then(|p| p.xmp.as_ref())
        .and_then(|x| x.dc.as_ref())
        .and_then(|dc| dc.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(title) = xmp_title {
        return title.to_string();
    }

    let stem = payload
        .and_then(|p| p.import_source.as_ref())
        .and_then(|s| s.file_name.as_deref())
        .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
        .map(str::trim)
        .filter(|s| !s.is_empty());

    stem.map(str::to_string)
        .unwrap_or_else(|| resource.asset_id().to_string())
}

/// Camera label without the maker repeated when the model already names it.
pub fn camera_label(make: Option<&str>, model: Option<&str>) -> Option<String> {
    let make = make.map(str::trim).filter(|s| !s.is_empty());
    let model = model.map(str::trim).filter(|s| !s.is_empty());
    match (make, model) {
        (Some(make), Some(model)) => {
            let brand = make.split_whitespace().next().unwrap_or(make);
            if model.to_ascii_lowercase().starts_with(&brand.to_ascii_lowercase()) {
                Some(model.to_string())
            } else {
                Some(format!("{make} {model}"))
            }
        }
        (None, Some(model)) => Some(model.to_string()),
        (Some(make), None) => Some(make.to_string()),
        (None, None) => None,
    }
}

/// Lightroom capture dates come with or without an offset; offsetless ones are taken as UTC.
pub fn parse_capture_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn map_asset(
    resource: &AlbumAsset,
    sort_order: i64,
    thumb_path: String,
    medium_path: String,
) -> PhotoUpsert {
    let empty = AssetPayload::default();
    let payload = resource.asset.as_ref().map_or(&empty, |a| &a.payload);
    let source = payload.import_source.as_ref();
    let xmp = payload.xmp.as_ref();

    PhotoUpsert {
        id: resource.asset_id().to_string(),
        title: photo_title(resource),
        sort_order,
        thumb_path,
        medium_path,
        width: source.and_then(|s| s.original_width).map(i64::from),
        height: source.and_then(|s| s.original_height).map(i64::from),
        camera: camera_label(
            xmp.and_then(|x| x.tiff.as_ref()).and_then(|t| t.make.as_deref()),
            xmp.and_then(|x| x.tiff.as_ref()).and_then(|t| t.model.as_deref()),
        ),
        lens: xmp
            .and_then(|x| x.aux.as_ref())
            .and_then(|a| a.lens.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        latitude: payload.location.as_ref().map(|l| l.latitude),
        longitude: payload.location.as_ref().map(|l| l.longitude),
        taken_at: payload
            .capture_date
            .as_deref()
            .and_then(parse_capture_date),
    }
}

/// Remote order, except photos referenced by chapters lead in chapter order.
///
/// `chapters` must already be sorted by `sort_order`. Ids not present in `assets` are ignored,
/// and a photo listed by several chapters keeps its first position.
pub fn order_assets(assets: Vec<AlbumAsset>, chapters: &[DbChapter]) -> Vec<AlbumAsset> {
    if chapters.is_empty() {
        return assets;
    }

    let mut by_id: AHashMap<String, AlbumAsset> = AHashMap::with_capacity(assets.len());
    let mut remote_order = Vec::with_capacity(assets.len());
    for asset in assets {
        let id = asset.asset_id().to_string();
        if !by_id.contains_key(&id) {
            remote_order.push(id.clone());
            by_id.insert(id, asset);
        }
    }

    let mut seen = AHashSet::new();
    let mut ordered = Vec::with_capacity(remote_order.len());
    let chapter_ids = chapters.iter().flat_map(|c| c.photo_ids.0.iter());
    for id in chapter_ids.chain(remote_order.iter()) {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(asset) = by_id.remove(id) {
            ordered.push(asset);
        }
    }
    ordered
}

/// Album date: the earliest capture date among its photos.
pub fn album_date(photos: &[PhotoUpsert]) -> Option<NaiveDate> {
    photos
        .iter()
        .filter_map(|p| p.taken_at)
        .min()
        .map(|dt| dt.date_naive())
}
