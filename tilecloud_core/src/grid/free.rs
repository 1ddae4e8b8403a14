//! A free grid: an arbitrary descending resolution ladder.
//!
//! Unlike the quad grid, levels are not related by powers of two. A level has
//! a parent only when some coarser resolution is an integer multiple of its
//! own; the multiple defines the parent/child factor.

use super::TileGrid;
use crate::types::{Bounds, Extent, PyramidLevels, TileCoord};
use anyhow::{Result, bail, ensure};

/// A grid defined by an explicit, strictly descending list of resolutions.
///
/// Resolutions are integers in `1/scale` world units per pixel, so that the
/// parent/child relation can be detected exactly: level `p` is the parent of
/// level `c` iff `resolutions[p] % resolutions[c] == 0` and no closer level
/// qualifies.
#[derive(Clone, Debug)]
pub struct FreeTileGrid {
	max_extent: Extent,
	tile_size: f64,
	resolutions: Vec<u64>,
	scale: f64,
	flip_y: bool,
	parent_zs: Vec<Option<u8>>,
	child_zs: Vec<Vec<u8>>,
}

impl FreeTileGrid {
	/// Creates a free grid.
	///
	/// # Errors
	/// Returns an error if `resolutions` is empty, not strictly descending,
	/// contains zero, or has more than 256 levels.
	pub fn new(
		max_extent: Extent,
		tile_size: f64,
		resolutions: Vec<u64>,
		scale: f64,
		flip_y: bool,
	) -> Result<FreeTileGrid> {
		ensure!(!resolutions.is_empty(), "at least one resolution is required");
		ensure!(resolutions.len() <= 256, "too many resolutions");
		ensure!(scale > 0.0, "scale must be positive");
		for pair in resolutions.windows(2) {
			ensure!(
				pair[0] > pair[1],
				"resolutions must be strictly descending ({} before {})",
				pair[0],
				pair[1]
			);
		}
		ensure!(*resolutions.last().unwrap() > 0, "resolutions must be positive");

		// Link each level to the closest coarser level with an integer factor.
		let mut parent_zs: Vec<Option<u8>> = vec![None; resolutions.len()];
		let mut child_zs: Vec<Vec<u8>> = vec![Vec::new(); resolutions.len()];
		for c in 1..resolutions.len() {
			for p in (0..c).rev() {
				if resolutions[p] % resolutions[c] == 0 {
					parent_zs[c] = Some(p as u8);
					child_zs[p].push(c as u8);
					break;
				}
			}
		}

		Ok(FreeTileGrid {
			max_extent,
			tile_size,
			resolutions,
			scale,
			flip_y,
			parent_zs,
			child_zs,
		})
	}

	/// The resolution ladder.
	#[must_use]
	pub fn resolutions(&self) -> &[u64] {
		&self.resolutions
	}

	/// World units covered by one tile edge at level `z`.
	fn unit(&self, z: u8) -> f64 {
		self.tile_size * self.resolutions[z as usize] as f64 / self.scale
	}

	/// Number of tile rows at level `z` (fractional when the extent is not
	/// an exact multiple of the tile span).
	fn rows(&self, z: u8) -> f64 {
		self.max_extent.height() / self.unit(z)
	}

	fn factor(&self, parent: u8, child: u8) -> u32 {
		(self.resolutions[parent as usize] / self.resolutions[child as usize]) as u32
	}
}

impl TileGrid for FreeTileGrid {
	fn zs(&self) -> Box<dyn Iterator<Item = u8> + '_> {
		Box::new(0..self.resolutions.len() as u8)
	}

	fn parent(&self, coord: &TileCoord) -> Option<TileCoord> {
		let p = self.parent_zs[coord.z as usize]?;
		let factor = self.factor(p, coord.z);
		Some(TileCoord {
			z: p,
			x: coord.x / factor,
			y: coord.y / factor,
			n: 1,
		})
	}

	fn children(&self, coord: &TileCoord) -> Vec<TileCoord> {
		let mut children = Vec::new();
		for &c in &self.child_zs[coord.z as usize] {
			let factor = self.factor(coord.z, c);
			for j in 0..factor {
				for i in 0..factor {
					children.push(TileCoord {
						z: c,
						x: coord.x * factor + i,
						y: coord.y * factor + j,
						n: 1,
					});
				}
			}
		}
		children
	}

	fn roots(&self) -> Vec<TileCoord> {
		let mut roots = Vec::new();
		for (z, parent) in self.parent_zs.iter().enumerate() {
			if parent.is_none() {
				let z = z as u8;
				let unit = self.unit(z);
				let nx = (self.max_extent.width() / unit).ceil() as u32;
				let ny = (self.max_extent.height() / unit).ceil() as u32;
				for y in 0..ny {
					for x in 0..nx {
						roots.push(TileCoord { z, x, y, n: 1 });
					}
				}
			}
		}
		roots
	}

	fn extent(&self, coord: &TileCoord, border: f64) -> Extent {
		let unit = self.unit(coord.z);
		let border = border / self.tile_size;
		let x = f64::from(coord.x);
		let n = f64::from(coord.n);
		let minx = self.max_extent.minx + unit * (x - border);
		let maxx = self.max_extent.minx + unit * (x + n + border);
		if self.flip_y {
			let y = f64::from(coord.y);
			Extent::new(
				minx,
				self.max_extent.maxy - unit * (y + n + border),
				maxx,
				self.max_extent.maxy - unit * (y - border),
			)
		} else {
			let y = f64::from(coord.y);
			Extent::new(
				minx,
				self.max_extent.miny + unit * (y - border),
				maxx,
				self.max_extent.miny + unit * (y + n + border),
			)
		}
	}

	fn tilecoord(&self, z: u8, x: f64, y: f64) -> Result<TileCoord> {
		ensure!((z as usize) < self.resolutions.len(), "z ({z}) is not a grid level");
		let unit = self.unit(z);
		let fx = (x - self.max_extent.minx) / unit;
		let fy = if self.flip_y {
			(self.max_extent.maxy - y) / unit
		} else {
			(y - self.max_extent.miny) / unit
		};
		if fx < 0.0 || fy < 0.0 || fx >= self.max_extent.width() / unit || fy >= self.rows(z) {
			bail!("world coordinate ({x}, {y}) is outside the grid extent");
		}
		TileCoord::new(z, fx.floor() as u32, fy.floor() as u32)
	}

	fn fill_up(&self, z: u8, levels: &mut PyramidLevels) {
		let Some(p) = self.parent_zs[z as usize] else { return };
		let factor = self.factor(p, z);
		if let Some(&(x, y)) = levels.get(&z) {
			let entry = levels
				.entry(p)
				.or_insert_with(|| (Bounds::new_empty(), Bounds::new_empty()));
			entry.0.update(&x.scaled_down(factor));
			entry.1.update(&y.scaled_down(factor));
		}
	}

	fn fill_down(&self, z: u8, levels: &mut PyramidLevels) {
		let children: Vec<u8> = self.child_zs[z as usize].clone();
		for c in children {
			let factor = self.factor(z, c);
			if let Some(&(x, y)) = levels.get(&z) {
				let entry = levels
					.entry(c)
					.or_insert_with(|| (Bounds::new_empty(), Bounds::new_empty()));
				entry.0.update(&x.scaled_up(factor));
				entry.1.update(&y.scaled_up(factor));
			}
		}
	}
}
