//! Adobe Lightroom API access: HTTP client, response guard handling, stored token access and
//! the IMS OAuth endpoints.

mod client;
mod guard;
pub mod oauth;
pub mod token;

pub use client::{AlbumWithCount, LightroomClient, RenditionSource, build_http_client};
pub use guard::{parse_guarded_json, strip_json_guard};
pub use token::{TokenCipher, access_token, is_expired, usable_access_token};

use axum::http::HeaderName;

pub const LIGHTROOM_USER_AGENT: &str = concat!("aperture/", env!("CARGO_PKG_VERSION"));

pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Page size used for album asset listings.
pub const ASSET_PAGE_LIMIT: u32 = 500;

/// Page size used for album listings.
pub const ALBUM_PAGE_LIMIT: u32 = 100;
