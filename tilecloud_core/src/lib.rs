//! Core of the TileCloud toolkit: tile coordinates, bounding pyramids, grids,
//! layouts, the [`TileStore`] contract, lazy tile streams and per-tile filters.
//!
//! Backend-specific stores (filesystem, MBTiles, S3, queues, …) live in the
//! sibling crates and plug into the [`TileStore`] trait defined here.

pub mod error;
pub mod filter;
pub mod grid;
pub mod layout;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod stream;
pub mod types;

pub use error::{ParseError, TooManyErrors, UnsupportedOperation};
pub use grid::{FreeTileGrid, QuadTileGrid, TileGrid, web_mercator};
pub use layout::{OsmTileLayout, TileLayout, WrappedTileLayout};
pub use pipeline::{Pipeline, TileFilter};
pub use registry::StoreRegistry;
pub use store::{
	BoundingPyramidTileStore, FindFirstTileStore, MemoryTileStore, NullTileStore,
	RenderingTheWorldTileStore, SearchUpTileStore, StoreCapability, TileStore,
};
pub use stream::TileStream;
pub use types::{BackendHandle, Blob, BoundingPyramid, Bounds, Extent, PyramidLevels, Tile, TileCoord};
