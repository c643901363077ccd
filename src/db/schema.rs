//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema includes:
/// - `oauth_tokens` table (singleton Lightroom token row)
/// - `galleries` table (sync sources)
/// - `albums` / `photos` tables (sync output, keyed by Lightroom ids)
/// - `chapters` table (admin-managed album storytelling, read by sync for ordering)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- OAuth token (one row, id = 'lightroom')
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS oauth_tokens (
    id TEXT PRIMARY KEY NOT NULL,
    access_token TEXT NOT NULL,
    access_token_encrypted INTEGER NOT NULL DEFAULT 0,
    refresh_token TEXT NULL,
    expires_at TEXT NOT NULL, -- RFC3339
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

-- ---------------------------------------------------------------------------
-- Galleries
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS galleries (
    id TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL, -- 'private' | 'public'
    url TEXT NULL,
    album_id TEXT NULL,
    album_name TEXT NULL,
    featured INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

-- ---------------------------------------------------------------------------
-- Albums (id = Lightroom album id)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS albums (
    id TEXT PRIMARY KEY NOT NULL,
    gallery_id TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT NULL,
    location TEXT NULL,
    date TEXT NULL, -- YYYY-MM-DD
    cover_image TEXT NULL,
    featured INTEGER NOT NULL DEFAULT 0,
    photo_count INTEGER NOT NULL DEFAULT 0,
    last_synced TEXT NULL, -- RFC3339
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_albums_gallery ON albums(gallery_id);

-- ---------------------------------------------------------------------------
-- Photos (one (album_id, id) per row, id = Lightroom asset id)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS photos (
    album_id TEXT NOT NULL REFERENCES albums(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    title TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    thumb_path TEXT NOT NULL,
    medium_path TEXT NOT NULL,
    width INTEGER NULL,
    height INTEGER NULL,
    camera TEXT NULL,
    lens TEXT NULL,
    latitude REAL NULL,
    longitude REAL NULL,
    taken_at TEXT NULL, -- RFC3339
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    PRIMARY KEY (album_id, id)
);

CREATE INDEX IF NOT EXISTS idx_photos_album_order ON photos(album_id, sort_order);

-- ---------------------------------------------------------------------------
-- Chapters
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chapters (
    id TEXT PRIMARY KEY NOT NULL,
    album_id TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NULL,
    photo_ids TEXT NOT NULL DEFAULT '[]', -- JSON array of photo ids
    cover_photo_id TEXT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_chapters_album ON chapters(album_id, sort_order);
"#;
