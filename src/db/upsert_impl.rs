//! `DbUpsert` implementations.
//!
//! This sits in the `db` module because it contains SQL/table knowledge.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::models::LIGHTROOM_TOKEN_ID;
use super::upsert::{
    AlbumSync, AlbumSyncOutcome, ChapterUpsert, DbUpsert, GalleryUpsert, TokenUpsert,
};
use crate::error::ApertureError;

#[async_trait]
impl DbUpsert for TokenUpsert {
    type Output = ();

    async fn upsert(self, pool: &SqlitePool) -> Result<(), ApertureError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO oauth_tokens (
                id, access_token, access_token_encrypted, refresh_token, expires_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                access_token_encrypted = excluded.access_token_encrypted,
                refresh_token = COALESCE(excluded.refresh_token, refresh_token),
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(LIGHTROOM_TOKEN_ID)
        .bind(self.access_token)
        .bind(self.access_token_encrypted)
        .bind(self.refresh_token)
        .bind(self.expires_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        debug!(expires_at = %self.expires_at, "db token upserted");
        Ok(())
    }
}

#[async_trait]
impl DbUpsert for GalleryUpsert {
    type Output = ();

    async fn upsert(self, pool: &SqlitePool) -> Result<(), ApertureError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO galleries (
                id, kind, url, album_id, album_name, featured, sort_order, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                url = excluded.url,
                album_id = excluded.album_id,
                album_name = excluded.album_name,
                featured = excluded.featured,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(self.kind)
        .bind(self.url)
        .bind(self.album_id)
        .bind(self.album_name)
        .bind(self.featured)
        .bind(self.sort_order)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        debug!(gallery_id = %self.id, kind = ?self.kind, "db gallery upserted");
        Ok(())
    }
}

#[async_trait]
impl DbUpsert for ChapterUpsert {
    type Output = ();

    async fn upsert(self, pool: &SqlitePool) -> Result<(), ApertureError> {
        let now = Utc::now();
        let photo_ids = serde_json::to_string(&self.photo_ids)?;
        sqlx::query(
            r#"
            INSERT INTO chapters (
                id, album_id, title, content, photo_ids, cover_photo_id, sort_order, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                album_id = excluded.album_id,
                title = excluded.title,
                content = excluded.content,
                photo_ids = excluded.photo_ids,
                cover_photo_id = excluded.cover_photo_id,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(self.album_id)
        .bind(self.title)
        .bind(self.content)
        .bind(photo_ids)
        .bind(self.cover_photo_id)
        .bind(self.sort_order)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DbUpsert for AlbumSync {
    type Output = AlbumSyncOutcome;

    async fn upsert(self, pool: &SqlitePool) -> Result<AlbumSyncOutcome, ApertureError> {
        let AlbumSync { album, photos } = self;
        let now = Utc::now();
        let photo_count = i64::try_from(photos.len()).unwrap_or(i64::MAX);

        let mut tx = pool.begin().await?;

        let slug = resolve_slug(&mut tx, &album.id, &album.slug).await?;

        sqlx::query(
            r#"
            INSERT INTO albums (
                id, gallery_id, slug, title, date, cover_image, featured, photo_count, last_synced, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                gallery_id = excluded.gallery_id,
                slug = excluded.slug,
                title = excluded.title,
                date = excluded.date,
                cover_image = excluded.cover_image,
                featured = excluded.featured,
                photo_count = excluded.photo_count,
                last_synced = excluded.last_synced,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&album.id)
        .bind(&album.gallery_id)
        .bind(&slug)
        .bind(&album.title)
        .bind(album.date)
        .bind(&album.cover_image)
        .bind(album.featured)
        .bind(photo_count)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut keep: Vec<&str> = Vec::with_capacity(photos.len());
        for photo in &photos {
            keep.push(photo.id.as_str());
            sqlx::query(
                r#"
                INSERT INTO photos (
                    album_id, id, title, sort_order, thumb_path, medium_path, width, height,
                    camera, lens, latitude, longitude, taken_at, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(album_id, id) DO UPDATE SET
                    title = excluded.title,
                    sort_order = excluded.sort_order,
                    thumb_path = excluded.thumb_path,
                    medium_path = excluded.medium_path,
                    width = excluded.width,
                    height = excluded.height,
                    camera = excluded.camera,
                    lens = excluded.lens,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    taken_at = excluded.taken_at,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&album.id)
            .bind(&photo.id)
            .bind(&photo.title)
            .bind(photo.sort_order)
            .bind(&photo.thumb_path)
            .bind(&photo.medium_path)
            .bind(photo.width)
            .bind(photo.height)
            .bind(&photo.camera)
            .bind(&photo.lens)
            .bind(photo.latitude)
            .bind(photo.longitude)
            .bind(photo.taken_at)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let keep_json = serde_json::to_string(&keep)?;
        let removed = sqlx::query(
            r#"
            DELETE FROM photos
            WHERE album_id = ? AND id NOT IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(&album.id)
        .bind(keep_json)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        debug!(
            album_id = %album.id,
            slug = %slug,
            photos = photo_count,
            removed,
            "db album synced"
        );

        Ok(AlbumSyncOutcome {
            album_id: album.id,
            slug,
            photos: photos.len() as u64,
            removed,
        })
    }
}

/// Returns `preferred` unless another album owns it, in which case an id-derived suffix is added.
async fn resolve_slug(
    tx: &mut Transaction<'_, Sqlite>,
    album_id: &str,
    preferred: &str,
) -> Result<String, ApertureError> {
    let suffix: String = album_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(8)
        .collect();

    let candidates = [
        preferred.to_string(),
        format!("{preferred}-{suffix}"),
        format!("{preferred}-{}", album_id.to_ascii_lowercase()),
    ];

    for candidate in candidates {
        let owner: Option<String> = sqlx::query_scalar("SELECT id FROM albums WHERE slug = ?")
            .bind(&candidate)
            .fetch_optional(&mut **tx)
            .await?;
        match owner {
            None => return Ok(candidate),
            Some(owner) if owner == album_id => return Ok(candidate),
            Some(_) => continue,
        }
    }

    Err(ApertureError::UnexpectedError(format!(
        "no free slug for album {album_id}"
    )))
}
