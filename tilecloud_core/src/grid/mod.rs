//! Tile grids: the mapping between tile coordinates and world coordinates,
//! and the parent/child relation between zoom levels.

mod free;
mod quad;

pub use free::FreeTileGrid;
pub use quad::QuadTileGrid;

use crate::types::{Extent, PyramidLevels, TileCoord};
use anyhow::Result;
use std::{fmt::Debug, sync::Arc};

/// A multi-resolution tile grid.
///
/// Implementations define the zoom ladder, the parent/child relation used to
/// propagate bounding pyramids between levels, and the projection between
/// tile indices and world (projected) coordinates.
pub trait TileGrid: Debug + Send + Sync {
	/// The zoom levels of this grid, ascending.
	fn zs(&self) -> Box<dyn Iterator<Item = u8> + '_>;

	/// The coordinate of the parent tile, if the level has one.
	fn parent(&self, coord: &TileCoord) -> Option<TileCoord>;

	/// The coordinates covering `coord` at the next finer level(s).
	fn children(&self, coord: &TileCoord) -> Vec<TileCoord>;

	/// The tiles at the coarsest level(s) of the grid.
	fn roots(&self) -> Vec<TileCoord>;

	/// World-coordinate extent of a tile, expanded by `border` pixels on
	/// each side.
	fn extent(&self, coord: &TileCoord, border: f64) -> Extent;

	/// The tile at level `z` containing the world coordinate `(x, y)`.
	///
	/// # Errors
	/// Returns an error if the coordinate lies outside the grid extent or
	/// `z` is not a level of this grid.
	fn tilecoord(&self, z: u8, x: f64, y: f64) -> Result<TileCoord>;

	/// Propagates the bounds at level `z` onto the parent level.
	fn fill_up(&self, z: u8, levels: &mut PyramidLevels);

	/// Propagates the bounds at level `z` onto the child level(s).
	fn fill_down(&self, z: u8, levels: &mut PyramidLevels);
}

lazy_static::lazy_static! {
	static ref WEB_MERCATOR: Arc<QuadTileGrid> = Arc::new(QuadTileGrid::web_mercator());
}

/// The shared EPSG:3857 quad grid (256px tiles, y counted from the top).
///
/// This is the default grid of [`BoundingPyramid`](crate::BoundingPyramid).
#[must_use]
pub fn web_mercator() -> Arc<QuadTileGrid> {
	WEB_MERCATOR.clone()
}
