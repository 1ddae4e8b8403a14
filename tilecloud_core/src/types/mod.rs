//! Value types of the tile pipeline: payloads, coordinates, bounds and the
//! tile itself.

mod blob;
mod bounding_pyramid;
mod bounds;
mod extent;
mod tile;
mod tile_coord;

pub use blob::Blob;
pub use bounding_pyramid::{BoundingPyramid, PyramidLevels};
pub use bounds::Bounds;
pub use extent::Extent;
pub use tile::{BackendHandle, Tile};
pub use tile_coord::TileCoord;
