pub mod lightroom;

pub use lightroom::{Album, AlbumAsset, Asset, Catalog, Page};
