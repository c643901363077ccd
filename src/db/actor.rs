use crate::db::models::{
    DbAlbum, DbChapter, DbGallery, DbPhoto, DbStoredToken, LIGHTROOM_TOKEN_ID, SyncStats,
};
use crate::db::schema::SQLITE_INIT;
use crate::db::upsert::{
    AlbumSync, AlbumSyncOutcome, ChapterUpsert, DbUpsert, GalleryUpsert, TokenUpsert,
};
use crate::error::ApertureError;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

type Reply<T> = RpcReplyPort<Result<T, ApertureError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert or replace the singleton Lightroom token.
    UpsertToken(TokenUpsert, Reply<()>),

    /// Read the singleton Lightroom token, if any.
    GetToken(Reply<Option<DbStoredToken>>),

    /// Create or update a gallery definition.
    UpsertGallery(GalleryUpsert, Reply<()>),

    /// All galleries ordered by (sort_order, id).
    ListGalleries(Reply<Vec<DbGallery>>),

    GetGallery(String, Reply<Option<DbGallery>>),

    /// Write an album and its full photo list in one transaction.
    SyncAlbum(AlbumSync, Reply<AlbumSyncOutcome>),

    ListAlbums(Reply<Vec<DbAlbum>>),

    /// Photos of one album in display order.
    ListPhotos(String, Reply<Vec<DbPhoto>>),

    /// Chapters of one album ordered by sort_order.
    ListChapters(String, Reply<Vec<DbChapter>>),

    UpsertChapter(ChapterUpsert, Reply<()>),

    Stats(Reply<SyncStats>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn upsert_token(&self, token: TokenUpsert) -> Result<(), ApertureError> {
        ractor::call!(self.actor, DbActorMessage::UpsertToken, token)
            .map_err(|e| ApertureError::RactorError(format!("DbActor UpsertToken RPC failed: {e}")))?
    }

    pub async fn get_token(&self) -> Result<Option<DbStoredToken>, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::GetToken)
            .map_err(|e| ApertureError::RactorError(format!("DbActor GetToken RPC failed: {e}")))?
    }

    pub async fn upsert_gallery(&self, gallery: GalleryUpsert) -> Result<(), ApertureError> {
        ractor::call!(self.actor, DbActorMessage::UpsertGallery, gallery).map_err(|e| {
            ApertureError::RactorError(format!("DbActor UpsertGallery RPC failed: {e}"))
        })?
    }

    pub async fn list_galleries(&self) -> Result<Vec<DbGallery>, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::ListGalleries).map_err(|e| {
            ApertureError::RactorError(format!("DbActor ListGalleries RPC failed: {e}"))
        })?
    }

    pub async fn get_gallery(&self, id: &str) -> Result<Option<DbGallery>, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::GetGallery, id.to_string()).map_err(|e| {
            ApertureError::RactorError(format!("DbActor GetGallery RPC failed: {e}"))
        })?
    }

    pub async fn sync_album(&self, sync: AlbumSync) -> Result<AlbumSyncOutcome, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::SyncAlbum, sync)
            .map_err(|e| ApertureError::RactorError(format!("DbActor SyncAlbum RPC failed: {e}")))?
    }

    pub async fn list_albums(&self) -> Result<Vec<DbAlbum>, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::ListAlbums)
            .map_err(|e| ApertureError::RactorError(format!("DbActor ListAlbums RPC failed: {e}")))?
    }

    pub async fn list_photos(&self, album_id: &str) -> Result<Vec<DbPhoto>, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::ListPhotos, album_id.to_string())
            .map_err(|e| ApertureError::RactorError(format!("DbActor ListPhotos RPC failed: {e}")))?
    }

    pub async fn list_chapters(&self, album_id: &str) -> Result<Vec<DbChapter>, ApertureError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListChapters,
            album_id.to_string()
        )
        .map_err(|e| ApertureError::RactorError(format!("DbActor ListChapters RPC failed: {e}")))?
    }

    pub async fn upsert_chapter(&self, chapter: ChapterUpsert) -> Result<(), ApertureError> {
        ractor::call!(self.actor, DbActorMessage::UpsertChapter, chapter).map_err(|e| {
            ApertureError::RactorError(format!("DbActor UpsertChapter RPC failed: {e}"))
        })?
    }

    pub async fn stats(&self) -> Result<SyncStats, ApertureError> {
        ractor::call!(self.actor, DbActorMessage::Stats)
            .map_err(|e| ApertureError::RactorError(format!("DbActor Stats RPC failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::UpsertToken(token, reply) => {
                let _ = reply.send(token.upsert(pool).await);
            }
            DbActorMessage::GetToken(reply) => {
                let _ = reply.send(self.get_token(pool).await);
            }
            DbActorMessage::UpsertGallery(gallery, reply) => {
                let _ = reply.send(gallery.upsert(pool).await);
            }
            DbActorMessage::ListGalleries(reply) => {
                let _ = reply.send(self.list_galleries(pool).await);
            }
            DbActorMessage::GetGallery(id, reply) => {
                let _ = reply.send(self.get_gallery(pool, &id).await);
            }
            DbActorMessage::SyncAlbum(sync, reply) => {
                let _ = reply.send(sync.upsert(pool).await);
            }
            DbActorMessage::ListAlbums(reply) => {
                let _ = reply.send(self.list_albums(pool).await);
            }
            DbActorMessage::ListPhotos(album_id, reply) => {
                let _ = reply.send(self.list_photos(pool, &album_id).await);
            }
            DbActorMessage::ListChapters(album_id, reply) => {
                let _ = reply.send(self.list_chapters(pool, &album_id).await);
            }
            DbActorMessage::UpsertChapter(chapter, reply) => {
                let _ = reply.send(chapter.upsert(pool).await);
            }
            DbActorMessage::Stats(reply) => {
                let _ = reply.send(self.stats(pool).await);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn get_token(&self, pool: &SqlitePool) -> Result<Option<DbStoredToken>, ApertureError> {
        let row = sqlx::query_as::<_, DbStoredToken>(
            r#"
        SELECT id, access_token, access_token_encrypted, refresh_token, expires_at, created_at, updated_at
        FROM oauth_tokens
        WHERE id = ?
        "#,
        )
        .bind(LIGHTROOM_TOKEN_ID)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn list_galleries(&self, pool: &SqlitePool) -> Result<Vec<DbGallery>, ApertureError> {
        let rows = sqlx::query_as::<_, DbGallery>(
            r#"
        SELECT id, kind, url, album_id, album_name, featured, sort_order, created_at, updated_at
        FROM galleries
        ORDER BY sort_order, id
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn get_gallery(
        &self,
        pool: &SqlitePool,
        id: &str,
    ) -> Result<Option<DbGallery>, ApertureError> {
        let row = sqlx::query_as::<_, DbGallery>(
            r#"
        SELECT id, kind, url, album_id, album_name, featured, sort_order, created_at, updated_at
        FROM galleries
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn list_albums(&self, pool: &SqlitePool) -> Result<Vec<DbAlbum>, ApertureError> {
        let rows = sqlx::query_as::<_, DbAlbum>(
            r#"
        SELECT id, gallery_id, slug, title, description, location, date, cover_image, featured,
               photo_count, last_synced, created_at, updated_at
        FROM albums
        ORDER BY date DESC, title
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list_photos(
        &self,
        pool: &SqlitePool,
        album_id: &str,
    ) -> Result<Vec<DbPhoto>, ApertureError> {
        let rows = sqlx::query_as::<_, DbPhoto>(
            r#"
        SELECT album_id, id, title, sort_order, thumb_path, medium_path, width, height, camera, lens,
               latitude, longitude, taken_at, created_at, updated_at
        FROM photos
        WHERE album_id = ?
        ORDER BY sort_order
        "#,
        )
        .bind(album_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list_chapters(
        &self,
        pool: &SqlitePool,
        album_id: &str,
    ) -> Result<Vec<DbChapter>, ApertureError> {
        let rows = sqlx::query_as::<_, DbChapter>(
            r#"
        SELECT id, album_id, title, content, photo_ids, cover_photo_id, sort_order, created_at, updated_at
        FROM chapters
        WHERE album_id = ?
        ORDER BY sort_order, id
        "#,
        )
        .bind(album_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn stats(&self, pool: &SqlitePool) -> Result<SyncStats, ApertureError> {
        let last_updated: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
        SELECT last_synced
        FROM albums
        WHERE last_synced IS NOT NULL
        ORDER BY last_synced DESC
        LIMIT 1
        "#,
        )
        .fetch_optional(pool)
        .await?;

        let album_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM albums")
            .fetch_one(pool)
            .await?;
        let photo_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos")
            .fetch_one(pool)
            .await?;

        Ok(SyncStats {
            last_updated,
            album_count,
            photo_count,
        })
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// The actor is unnamed so several databases can live in one process.
pub async fn spawn(database_url: &str) -> DbActorHandle {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .expect("failed to spawn DbActor");

    DbActorHandle { actor }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), ApertureError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
