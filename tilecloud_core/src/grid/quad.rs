//! The dyadic quad grid: every tile splits into 2×2 children.

use super::TileGrid;
use crate::types::{Extent, PyramidLevels, TileCoord};
use anyhow::{Result, bail, ensure};

/// Half the circumference of the web-mercator world, in metres.
const WEB_MERCATOR_HALF_WORLD: f64 = 20037508.342789244;

/// A quad grid: level `z` has `2^z × 2^z` tiles, each parent covering a 2×2
/// block of children.
///
/// # Examples
///
/// ```
/// use tilecloud_core::{QuadTileGrid, TileGrid, TileCoord};
///
/// let grid = QuadTileGrid::web_mercator();
/// let coord = TileCoord::new(2, 1, 3).unwrap();
/// assert_eq!(grid.parent(&coord), Some(TileCoord::new(1, 0, 1).unwrap()));
/// assert_eq!(grid.children(&coord).len(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct QuadTileGrid {
	max_extent: Extent,
	tile_size: f64,
	flip_y: bool,
	max_z: u8,
}

impl QuadTileGrid {
	/// Creates a quad grid over `max_extent` with square tiles of
	/// `tile_size` pixels.
	///
	/// With `flip_y` the tile `y` index counts from the top edge of the
	/// extent (the XYZ/slippy-map convention); without it, from the bottom
	/// (TMS).
	#[must_use]
	pub fn new(max_extent: Extent, tile_size: f64, flip_y: bool, max_z: u8) -> QuadTileGrid {
		QuadTileGrid {
			max_extent,
			tile_size,
			flip_y,
			max_z: max_z.min(31),
		}
	}

	/// The standard EPSG:3857 grid: square world extent, 256px tiles, `y`
	/// counted from the top.
	#[must_use]
	pub fn web_mercator() -> QuadTileGrid {
		QuadTileGrid::new(
			Extent::new(
				-WEB_MERCATOR_HALF_WORLD,
				-WEB_MERCATOR_HALF_WORLD,
				WEB_MERCATOR_HALF_WORLD,
				WEB_MERCATOR_HALF_WORLD,
			),
			256.0,
			true,
			31,
		)
	}

	#[must_use]
	pub fn tile_size(&self) -> f64 {
		self.tile_size
	}

	#[must_use]
	pub fn max_extent(&self) -> Extent {
		self.max_extent
	}

	/// Tiles per side at level `z`.
	fn side(z: u8) -> f64 {
		2f64.powi(i32::from(z))
	}
}

impl TileGrid for QuadTileGrid {
	fn zs(&self) -> Box<dyn Iterator<Item = u8> + '_> {
		Box::new(0..=self.max_z)
	}

	fn parent(&self, coord: &TileCoord) -> Option<TileCoord> {
		if coord.z == 0 {
			None
		} else {
			Some(TileCoord {
				z: coord.z - 1,
				x: coord.x / 2,
				y: coord.y / 2,
				n: 1,
			})
		}
	}

	fn children(&self, coord: &TileCoord) -> Vec<TileCoord> {
		if coord.z >= self.max_z {
			return Vec::new();
		}
		let (z, x, y) = (coord.z + 1, coord.x * 2, coord.y * 2);
		vec![
			TileCoord { z, x, y, n: 1 },
			TileCoord { z, x: x + 1, y, n: 1 },
			TileCoord { z, x, y: y + 1, n: 1 },
			TileCoord { z, x: x + 1, y: y + 1, n: 1 },
		]
	}

	fn roots(&self) -> Vec<TileCoord> {
		vec![TileCoord { z: 0, x: 0, y: 0, n: 1 }]
	}

	fn extent(&self, coord: &TileCoord, border: f64) -> Extent {
		let side = Self::side(coord.z);
		let unit_x = self.max_extent.width() / side;
		let unit_y = self.max_extent.height() / side;
		let border = border / self.tile_size;

		let x = f64::from(coord.x);
		let n = f64::from(coord.n);
		let minx = self.max_extent.minx + unit_x * (x - border);
		let maxx = self.max_extent.minx + unit_x * (x + n + border);

		if self.flip_y {
			let y = f64::from(coord.y);
			Extent::new(
				minx,
				self.max_extent.maxy - unit_y * (y + n + border),
				maxx,
				self.max_extent.maxy - unit_y * (y - border),
			)
		} else {
			let y = f64::from(coord.y);
			Extent::new(
				minx,
				self.max_extent.miny + unit_y * (y - border),
				maxx,
				self.max_extent.miny + unit_y * (y + n + border),
			)
		}
	}

	fn tilecoord(&self, z: u8, x: f64, y: f64) -> Result<TileCoord> {
		ensure!(z <= self.max_z, "z ({z}) exceeds the grid's maximum ({})", self.max_z);
		let side = Self::side(z);
		let fx = (x - self.max_extent.minx) * side / self.max_extent.width();
		let fy = if self.flip_y {
			(self.max_extent.maxy - y) * side / self.max_extent.height()
		} else {
			(y - self.max_extent.miny) * side / self.max_extent.height()
		};
		if fx < 0.0 || fx >= side || fy < 0.0 || fy >= side {
			bail!("world coordinate ({x}, {y}) is outside the grid extent");
		}
		TileCoord::new(z, fx.floor() as u32, fy.floor() as u32)
	}

	fn fill_up(&self, z: u8, levels: &mut PyramidLevels) {
		if z == 0 {
			return;
		}
		if let Some(&(x, y)) = levels.get(&z) {
			let entry = levels
				.entry(z - 1)
				.or_insert_with(|| (crate::Bounds::new_empty(), crate::Bounds::new_empty()));
			entry.0.update(&x.scaled_down(2));
			entry.1.update(&y.scaled_down(2));
		}
	}

	fn fill_down(&self, z: u8, levels: &mut PyramidLevels) {
		if z >= self.max_z {
			return;
		}
		if let Some(&(x, y)) = levels.get(&z) {
			let entry = levels
				.entry(z + 1)
				.or_insert_with(|| (crate::Bounds::new_empty(), crate::Bounds::new_empty()));
			entry.0.update(&x.scaled_up(2));
			entry.1.update(&y.scaled_up(2));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn unit_grid(flip_y: bool) -> QuadTileGrid {
		QuadTileGrid::new(Extent::new(0.0, 0.0, 16.0, 16.0), 256.0, flip_y, 8)
	}

	#[test]
	fn parent_child_inverse() {
		let grid = unit_grid(false);
		let parent = TileCoord::new(2, 1, 3).unwrap();
		for child in grid.children(&parent) {
			assert_eq!(grid.parent(&child), Some(parent));
		}
		assert_eq!(grid.parent(&TileCoord::new(0, 0, 0).unwrap()), None);
	}

	#[test]
	fn extent_without_flip() {
		let grid = unit_grid(false);
		let extent = grid.extent(&TileCoord::new(2, 1, 2).unwrap(), 0.0);
		assert_eq!(extent, Extent::new(4.0, 8.0, 8.0, 12.0));
	}

	#[test]
	fn extent_with_flip() {
		let grid = unit_grid(true);
		let extent = grid.extent(&TileCoord::new(2, 1, 2).unwrap(), 0.0);
		// y=2 of 4 from the top leaves one tile row below.
		assert_eq!(extent, Extent::new(4.0, 4.0, 8.0, 8.0));
	}

	#[test]
	fn extent_with_border() {
		let grid = unit_grid(false);
		let extent = grid.extent(&TileCoord::new(2, 1, 2).unwrap(), 64.0);
		assert_eq!(extent, Extent::new(3.0, 7.0, 9.0, 13.0));
	}

	#[rstest]
	#[case(false, 5.0, 9.0, 1, 2)]
	#[case(true, 5.0, 9.0, 1, 1)]
	#[case(true, 0.0, 15.9, 0, 0)]
	fn tilecoord_floors(#[case] flip_y: bool, #[case] x: f64, #[case] y: f64, #[case] tx: u32, #[case] ty: u32) {
		let grid = unit_grid(flip_y);
		assert_eq!(grid.tilecoord(2, x, y).unwrap(), TileCoord::new(2, tx, ty).unwrap());
	}

	#[test]
	fn tilecoord_outside_extent() {
		let grid = unit_grid(false);
		assert!(grid.tilecoord(2, -1.0, 0.0).is_err());
		assert!(grid.tilecoord(2, 0.0, 16.0).is_err());
	}

	#[test]
	fn extent_tilecoord_round_trip() {
		let grid = QuadTileGrid::web_mercator();
		let coord = TileCoord::new(7, 66, 45).unwrap();
		let extent = grid.extent(&coord, 0.0);
		let center_x = (extent.minx + extent.maxx) / 2.0;
		let center_y = (extent.miny + extent.maxy) / 2.0;
		assert_eq!(grid.tilecoord(7, center_x, center_y).unwrap(), coord);
	}
}
