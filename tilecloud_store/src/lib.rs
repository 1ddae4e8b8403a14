//! Backend tile stores.
//!
//! Each store implements the [`TileStore`](tilecloud_core::TileStore)
//! contract from `tilecloud_core` against a concrete backend: the local
//! filesystem, an MBTiles database, a ZIP archive, an HTTP endpoint, an S3
//! bucket, an Azure Blob container or a memcached cluster.

mod azure;
mod filesystem;
mod http;
mod mbtiles;
mod memcached;
mod s3;
mod zip_archive;

pub use azure::AzureTileStore;
pub use filesystem::FilesystemTileStore;
pub use http::HttpTileStore;
pub use mbtiles::MBTilesTileStore;
pub use memcached::MemcachedTileStore;
pub use s3::S3TileStore;
pub use zip_archive::ZipTileStore;
