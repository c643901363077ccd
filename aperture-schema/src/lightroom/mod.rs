mod album;
mod asset;
mod catalog;
mod page;

pub use album::{Album, AlbumCover, AlbumPayload};
pub use asset::{
    AlbumAsset, Asset, AssetLocation, AssetPayload, ImportSource, Xmp, XmpAux, XmpDc, XmpTiff,
};
pub use catalog::{Catalog, CatalogPayload};
pub use page::{Link, Links, Page};
