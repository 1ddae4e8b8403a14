//! Per-level tile bounds of a tile pyramid.

use super::{Bounds, TileCoord};
use crate::{error::ParseError, grid::TileGrid, grid::web_mercator};
use anyhow::{Result, ensure};
use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::BTreeMap, fmt::Debug, str::FromStr, sync::Arc};

/// The per-level `(x, y)` bounds map shared between pyramids and grids.
pub type PyramidLevels = BTreeMap<u8, (Bounds, Bounds)>;

lazy_static! {
	static ref FROM_STRING_RE: Regex = Regex::new(
		r"(?x)^
		(?P<z1>\d+)/(?P<x1>\d+)/(?P<y1>\d+):
		(?:(?P<plusz>\+)?(?P<z2>\d+)/)?
		(?:(?P<xstar>\*)|(?P<plusx>\+)?(?P<x2>\d+))/
		(?:(?P<ystar>\*)|(?P<plusy>\+)?(?P<y2>\d+))
		$"
	)
	.unwrap();
}

/// A compact description of tile extents per zoom level: for every level
/// where tiles exist, a pair of half-open [`Bounds`] over `x` and `y`.
///
/// The pyramid keeps a reference to its [`TileGrid`] so that bounds can be
/// propagated along the grid's parent/child relation with
/// [`fill_up`](Self::fill_up) and [`fill_down`](Self::fill_down).
///
/// # Examples
///
/// ```
/// use tilecloud_core::{BoundingPyramid, TileCoord};
///
/// let pyramid: BoundingPyramid = "0/0/0:2/*/*".parse().unwrap();
/// assert!(pyramid.contains(&TileCoord::new(2, 3, 3).unwrap()));
/// assert!(!pyramid.contains(&TileCoord::new(3, 0, 0).unwrap()));
/// assert_eq!(pyramid.count(), 1 + 4 + 16);
/// ```
#[derive(Clone)]
pub struct BoundingPyramid {
	levels: PyramidLevels,
	grid: Arc<dyn TileGrid>,
}

impl BoundingPyramid {
	/// An empty pyramid on the standard web-mercator quad grid.
	#[must_use]
	pub fn new() -> BoundingPyramid {
		Self::with_grid(web_mercator())
	}

	/// An empty pyramid on the given grid.
	#[must_use]
	pub fn with_grid(grid: Arc<dyn TileGrid>) -> BoundingPyramid {
		BoundingPyramid {
			levels: PyramidLevels::new(),
			grid,
		}
	}

	/// The grid this pyramid propagates bounds on.
	#[must_use]
	pub fn grid(&self) -> &Arc<dyn TileGrid> {
		&self.grid
	}

	/// Extends the bounds at `coord.z` to include `coord`.
	pub fn add(&mut self, coord: &TileCoord) {
		let entry = self
			.levels
			.entry(coord.z)
			.or_insert_with(|| (Bounds::new_empty(), Bounds::new_empty()));
		entry.0.add(coord.x);
		entry.1.add(coord.y);
	}

	/// Merges explicit bounds into level `z`.
	pub fn add_bounds(&mut self, z: u8, bounds: (Bounds, Bounds)) {
		let entry = self
			.levels
			.entry(z)
			.or_insert_with(|| (Bounds::new_empty(), Bounds::new_empty()));
		entry.0.update(&bounds.0);
		entry.1.update(&bounds.1);
	}

	#[must_use]
	pub fn contains(&self, coord: &TileCoord) -> bool {
		self
			.levels
			.get(&coord.z)
			.is_some_and(|(x, y)| x.contains(coord.x) && y.contains(coord.y))
	}

	/// The bounds pair at level `z`, if any tile exists there.
	#[must_use]
	pub fn bounds(&self, z: u8) -> Option<&(Bounds, Bounds)> {
		self.levels.get(&z)
	}

	/// The levels where any tile exists, ascending.
	pub fn zs(&self) -> impl Iterator<Item = u8> + '_ {
		self.levels.keys().copied()
	}

	#[must_use]
	pub fn zmin(&self) -> Option<u8> {
		self.levels.keys().next().copied()
	}

	#[must_use]
	pub fn zmax(&self) -> Option<u8> {
		self.levels.keys().next_back().copied()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	/// Total number of tiles described by the pyramid.
	#[must_use]
	pub fn count(&self) -> u64 {
		self
			.levels
			.values()
			.map(|(x, y)| u64::from(x.len()) * u64::from(y.len()))
			.sum()
	}

	/// Propagates bounds towards the coarser levels, down to level `top`.
	///
	/// Idempotent: filling an already filled pyramid changes nothing.
	pub fn fill_up(&mut self, top: u8) {
		let Some(zmax) = self.zmax() else { return };
		for z in (top.saturating_add(1)..=zmax).rev() {
			self.grid.fill_up(z, &mut self.levels);
		}
	}

	/// Propagates bounds towards the finer levels, up to level `bottom`.
	pub fn fill_down(&mut self, bottom: u8) {
		let Some(zmax) = self.zmax() else { return };
		for z in zmax..bottom {
			self.grid.fill_down(z, &mut self.levels);
		}
	}

	/// Iterates every tile coordinate, coarsest level first.
	pub fn iter_topdown(&self) -> impl Iterator<Item = TileCoord> + '_ {
		self.levels.iter().flat_map(|(&z, &(x, y))| {
			y.iter()
				.flat_map(move |y| x.iter().map(move |x| TileCoord { z, x, y, n: 1 }))
		})
	}

	/// Iterates every tile coordinate, finest level first.
	pub fn iter_bottomup(&self) -> impl Iterator<Item = TileCoord> + '_ {
		self.levels.iter().rev().flat_map(|(&z, &(x, y))| {
			y.iter()
				.flat_map(move |y| x.iter().map(move |x| TileCoord { z, x, y, n: 1 }))
		})
	}

	/// Enumerates the metatile coordinates of side `n` covering the pyramid,
	/// aligned to multiples of `n`, coarsest level first.
	pub fn metatilecoords(&self, n: u32) -> impl Iterator<Item = TileCoord> + '_ {
		self.levels.iter().flat_map(move |(&z, &(x, y))| {
			let aligned = move |bounds: Bounds| {
				let start = bounds.start().map_or(0, |s| n * (s / n));
				let stop = bounds.stop().unwrap_or(0);
				(start..stop).step_by(n as usize)
			};
			aligned(y).flat_map(move |y| {
				aligned(x).map(move |x| TileCoord { z, x, y, n })
			})
		})
	}

	/// Parses the bounding-pyramid mini-DSL on the given grid.
	///
	/// Forms: `z/x/y:Z/X/Y` (absolute, `X`/`Y` exclusive), relative deltas
	/// with a `+` prefix per component, `*` for the full range `[0, 2^z)`,
	/// and an optional `Z/` part; `Z < z` fills up, `Z > z` fills down.
	///
	/// # Errors
	/// Returns a [`ParseError`] on any other shape.
	pub fn from_string_with_grid(s: &str, grid: Arc<dyn TileGrid>) -> Result<BoundingPyramid> {
		let captures = FROM_STRING_RE
			.captures(s)
			.ok_or_else(|| ParseError::new(format!("invalid bounding pyramid '{s}'")))?;
		let int = |name: &str| -> Result<u32> {
			let digits = captures.name(name).unwrap().as_str();
			digits
				.parse()
				.map_err(|_| ParseError::new(format!("number '{digits}' out of range in '{s}'")).into())
		};

		let z1 = int("z1")?;
		ensure!(z1 <= 31, ParseError::new(format!("z ({z1}) must be <= 31 in '{s}'")));
		let z1 = z1 as u8;
		let x1 = int("x1")?;
		let y1 = int("y1")?;

		let stop = |star: &str, plus: &str, name: &str, from: u32| -> Result<u32> {
			if captures.name(star).is_some() {
				Ok(1u32 << z1)
			} else if captures.name(plus).is_some() {
				from.checked_add(int(name)?)
					.ok_or_else(|| ParseError::new(format!("number out of range in '{s}'")).into())
			} else {
				int(name)
			}
		};
		let x2 = stop("xstar", "plusx", "x2", x1)?;
		let y2 = stop("ystar", "plusy", "y2", y1)?;
		ensure!(
			x1 < x2 && y1 < y2,
			ParseError::new(format!("empty bounds in '{s}'"))
		);

		let mut pyramid = BoundingPyramid::with_grid(grid);
		pyramid.add_bounds(z1, (Bounds::new(x1, x2), Bounds::new(y1, y2)));

		if captures.name("z2").is_some() {
			let mut z2 = int("z2")?;
			if captures.name("plusz").is_some() {
				z2 += u32::from(z1);
			}
			ensure!(z2 <= 31, ParseError::new(format!("Z ({z2}) must be <= 31 in '{s}'")));
			let z2 = z2 as u8;
			if z1 < z2 {
				pyramid.fill_down(z2);
			} else if z1 > z2 {
				pyramid.fill_up(z2);
			}
		}

		Ok(pyramid)
	}
}

impl Default for BoundingPyramid {
	fn default() -> Self {
		Self::new()
	}
}

impl FromStr for BoundingPyramid {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<BoundingPyramid> {
		BoundingPyramid::from_string_with_grid(s, web_mercator())
	}
}

/// Pyramids compare by their levels; the grid reference is ignored.
impl PartialEq for BoundingPyramid {
	fn eq(&self, other: &Self) -> bool {
		self.levels == other.levels
	}
}

impl Debug for BoundingPyramid {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut map = f.debug_map();
		for (z, (x, y)) in &self.levels {
			map.entry(z, &format_args!("{x:?} x {y:?}"));
		}
		map.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn coord(z: u8, x: u32, y: u32) -> TileCoord {
		TileCoord::new(z, x, y).unwrap()
	}

	#[test]
	fn add_then_contains() {
		let mut pyramid = BoundingPyramid::new();
		pyramid.add(&coord(5, 9, 13));
		assert!(pyramid.contains(&coord(5, 9, 13)));
		assert!(!pyramid.contains(&coord(5, 9, 14)));
		assert!(!pyramid.contains(&coord(4, 9, 13)));
		assert_eq!(pyramid.count(), 1);
	}

	#[test]
	fn dsl_star_fills_down() {
		let pyramid: BoundingPyramid = "0/0/0:2/*/*".parse().unwrap();
		assert_eq!(pyramid.zs().collect::<Vec<u8>>(), vec![0, 1, 2]);
		assert!(pyramid.contains(&coord(0, 0, 0)));
		for x in 0..2 {
			for y in 0..2 {
				assert!(pyramid.contains(&coord(1, x, y)));
			}
		}
		for x in 0..4 {
			for y in 0..4 {
				assert!(pyramid.contains(&coord(2, x, y)));
			}
		}
		assert!(!pyramid.contains(&coord(3, 0, 0)));
		assert_eq!(pyramid.count(), 21);
	}

	#[test]
	fn dsl_relative_form() {
		let pyramid: BoundingPyramid = "5/9/13:+1/+2/+2".parse().unwrap();
		assert_eq!(pyramid.bounds(5), Some(&(Bounds::new(9, 11), Bounds::new(13, 15))));
		assert_eq!(pyramid.bounds(6), Some(&(Bounds::new(18, 22), Bounds::new(26, 30))));
		assert_eq!(pyramid.zmax(), Some(6));
	}

	#[test]
	fn dsl_absolute_without_z() {
		let pyramid: BoundingPyramid = "3/1/2:4/6".parse().unwrap();
		assert_eq!(pyramid.bounds(3), Some(&(Bounds::new(1, 4), Bounds::new(2, 6))));
		assert_eq!(pyramid.zs().count(), 1);
	}

	#[test]
	fn dsl_fills_up() {
		let pyramid: BoundingPyramid = "2/1/3:0/+1/+1".parse().unwrap();
		assert!(pyramid.contains(&coord(2, 1, 3)));
		assert!(pyramid.contains(&coord(1, 0, 1)));
		assert!(pyramid.contains(&coord(0, 0, 0)));
	}

	#[rstest]
	#[case("")]
	#[case("1/2")]
	#[case("1/2/3")]
	#[case("*/0/0:1/1")]
	#[case("1/0/0:*/1/1")]
	#[case("1/0/0:+*/+*")]
	#[case("a/b/c:d/e")]
	#[case("3/4/5:4/4")]
	fn dsl_rejects(#[case] s: &str) {
		let result: Result<BoundingPyramid> = s.parse();
		let err = result.err().expect("should fail");
		assert!(err.downcast_ref::<ParseError>().is_some(), "'{s}': {err}");
	}

	#[test]
	fn fill_up_is_idempotent() {
		let mut pyramid = BoundingPyramid::new();
		pyramid.add(&coord(4, 11, 6));
		pyramid.fill_up(0);
		let snapshot = pyramid.clone();
		pyramid.fill_up(0);
		assert_eq!(pyramid, snapshot);
		assert_eq!(pyramid.bounds(0), Some(&(Bounds::new(0, 1), Bounds::new(0, 1))));
		assert_eq!(pyramid.bounds(3), Some(&(Bounds::new(5, 6), Bounds::new(3, 4))));
	}

	#[test]
	fn fill_up_above_zmax_is_a_noop() {
		let mut pyramid = BoundingPyramid::new();
		pyramid.add(&coord(4, 11, 6));
		let snapshot = pyramid.clone();
		pyramid.fill_up(4);
		pyramid.fill_up(u8::MAX);
		assert_eq!(pyramid, snapshot);
	}

	#[test]
	fn iteration_orders() {
		let mut pyramid = BoundingPyramid::new();
		pyramid.add(&coord(1, 0, 0));
		pyramid.add(&coord(1, 1, 0));
		pyramid.add(&coord(2, 3, 3));
		let top: Vec<TileCoord> = pyramid.iter_topdown().collect();
		assert_eq!(top, vec![coord(1, 0, 0), coord(1, 1, 0), coord(2, 3, 3)]);
		let bottom: Vec<TileCoord> = pyramid.iter_bottomup().collect();
		assert_eq!(bottom, vec![coord(2, 3, 3), coord(1, 0, 0), coord(1, 1, 0)]);
	}

	#[test]
	fn metatilecoords_align() {
		let mut pyramid = BoundingPyramid::new();
		pyramid.add(&coord(3, 1, 2));
		pyramid.add(&coord(3, 5, 3));
		let metas: Vec<TileCoord> = pyramid.metatilecoords(2).collect();
		assert_eq!(
			metas,
			vec![
				TileCoord::new_metatile(3, 0, 2, 2).unwrap(),
				TileCoord::new_metatile(3, 2, 2, 2).unwrap(),
				TileCoord::new_metatile(3, 4, 2, 2).unwrap(),
			]
		);
		for meta in metas {
			assert_eq!(meta.n, 2);
			assert_eq!(meta.x % 2, 0);
		}
	}
}
