//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `upsert.rs`: write payloads and the `DbUpsert` contract
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)

pub mod actor;
pub mod models;
pub mod schema;
pub mod upsert;

mod upsert_impl;

pub use models::{
    DbAlbum, DbChapter, DbGallery, DbPhoto, DbStoredToken, GalleryKind, LIGHTROOM_TOKEN_ID,
    SyncStats,
};
pub use schema::SQLITE_INIT;
pub use upsert::{
    AlbumSync, AlbumSyncOutcome, AlbumUpsert, ChapterUpsert, DbUpsert, GalleryUpsert,
    PhotoUpsert, TokenUpsert,
};

pub use actor::{DbActorHandle, spawn};
