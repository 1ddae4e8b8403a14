//! Tile coordinates with optional metatile size.
//!
//! A [`TileCoord`] addresses a tile by zoom level `z` and indices `x`, `y`.
//! When the metatile size `n` is greater than one the coordinate addresses an
//! `n`×`n` block of unit tiles; `x` and `y` are then multiples of `n` and
//! point at the top-left unit tile of the block.
//!
//! # Examples
//!
//! ```
//! use tilecloud_core::TileCoord;
//!
//! let coord = TileCoord::new(5, 6, 7).unwrap();
//! assert_eq!(coord.to_string(), "5/6/7");
//!
//! let meta = coord.metatilecoord(2).unwrap();
//! assert_eq!(meta.to_string(), "5/6/6:+2/+2");
//! assert_eq!(meta.iter().count(), 4);
//! ```

use crate::error::ParseError;
use anyhow::{Result, ensure};
use std::{
	fmt::{self, Debug, Display},
	hash::{Hash, Hasher},
	str::FromStr,
};

/// A tile coordinate `(z, x, y)` with metatile size `n` (1 for unit tiles).
#[derive(Eq, PartialEq, Clone, Copy)]
pub struct TileCoord {
	/// The zoom level of the tile.
	pub z: u8,
	/// The x index of the tile.
	pub x: u32,
	/// The y index of the tile.
	pub y: u32,
	/// The metatile side length in unit tiles.
	pub n: u32,
}

impl TileCoord {
	/// Create a unit tile coordinate at zoom `z`.
	///
	/// # Errors
	/// Returns an error if `z` > 31.
	pub fn new(z: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(z <= 31, "z ({z}) must be <= 31");
		Ok(TileCoord { z, x, y, n: 1 })
	}

	/// Create a metatile coordinate of side `n`.
	///
	/// # Errors
	/// Returns an error if `z` > 31, `n` is zero, or `x`/`y` are not
	/// multiples of `n`.
	pub fn new_metatile(z: u8, x: u32, y: u32, n: u32) -> Result<TileCoord> {
		ensure!(z <= 31, "z ({z}) must be <= 31");
		ensure!(n >= 1, "metatile size must be >= 1");
		ensure!(x % n == 0, "x ({x}) must be a multiple of n ({n})");
		ensure!(y % n == 0, "y ({y}) must be a multiple of n ({n})");
		Ok(TileCoord { z, x, y, n })
	}

	/// The metatile of side `n` that contains this tile.
	///
	/// # Errors
	/// Returns an error if `n` is zero.
	pub fn metatilecoord(&self, n: u32) -> Result<TileCoord> {
		ensure!(n >= 1, "metatile size must be >= 1");
		Ok(TileCoord {
			z: self.z,
			x: n * (self.x / n),
			y: n * (self.y / n),
			n,
		})
	}

	/// Iterate over the `n`×`n` unit tiles of this (meta)tile, row-major.
	pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
		let &TileCoord { z, x, y, n } = self;
		(0..n).flat_map(move |j| {
			(0..n).map(move |i| TileCoord {
				z,
				x: x + i,
				y: y + j,
				n: 1,
			})
		})
	}

	/// Base-4 quadtree path of this tile, most significant bit first.
	///
	/// The character at depth `k` encodes the bit `z-1-k` of `x` (value 1)
	/// and of `y` (value 2).
	///
	/// # Examples
	///
	/// ```
	/// use tilecloud_core::TileCoord;
	///
	/// assert_eq!(TileCoord::new(3, 5, 6).unwrap().quadcode(), "321");
	/// ```
	#[must_use]
	pub fn quadcode(&self) -> String {
		let mut code = String::with_capacity(self.z as usize);
		for k in (0..self.z).rev() {
			let digit = ((self.x >> k) & 1) | (((self.y >> k) & 1) << 1);
			code.push(char::from(b'0' + digit as u8));
		}
		code
	}

	/// Parse a quadcode produced by [`quadcode`](Self::quadcode).
	///
	/// # Errors
	/// Returns a [`ParseError`] on characters outside `0..=3` or codes
	/// longer than 31 characters.
	pub fn from_quadcode(quadcode: &str) -> Result<TileCoord> {
		let z = u8::try_from(quadcode.len())
			.ok()
			.filter(|z| *z <= 31)
			.ok_or_else(|| ParseError::new(format!("quadcode '{quadcode}' is too long")))?;
		let mut x = 0u32;
		let mut y = 0u32;
		for c in quadcode.chars() {
			let digit = c
				.to_digit(4)
				.ok_or_else(|| ParseError::new(format!("invalid quadcode '{quadcode}'")))?;
			x = (x << 1) | (digit & 1);
			y = (y << 1) | ((digit >> 1) & 1);
		}
		Ok(TileCoord { z, x, y, n: 1 })
	}

	/// Stable per-level hash: `((x/n) << z) ^ (y/n)`.
	///
	/// Only coordinates at the same zoom level hash consistently relative to
	/// each other; this is what the sharding filters rely on.
	#[must_use]
	pub fn hash_value(&self) -> u64 {
		(u64::from(self.x / self.n) << self.z) ^ u64::from(self.y / self.n)
	}
}

impl Hash for TileCoord {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.hash_value());
	}
}

/// Formats as `z/x/y`, or `z/x/y:+n/+n` for metatiles.
impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.n == 1 {
			write!(f, "{}/{}/{}", self.z, self.x, self.y)
		} else {
			write!(f, "{}/{}/{}:+{}/+{}", self.z, self.x, self.y, self.n, self.n)
		}
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({self})")
	}
}

impl FromStr for TileCoord {
	type Err = anyhow::Error;

	/// Parses `z/x/y` and `z/x/y:+n/+n`.
	fn from_str(s: &str) -> Result<TileCoord> {
		let invalid = || ParseError::new(format!("invalid tile coordinate '{s}'"));

		let (head, meta) = match s.split_once(':') {
			Some((head, meta)) => (head, Some(meta)),
			None => (s, None),
		};

		let mut parts = head.splitn(3, '/');
		let mut next = || -> Result<u32> {
			parts
				.next()
				.and_then(|p| p.parse().ok())
				.ok_or_else(|| invalid().into())
		};
		let z = next()?;
		let x = next()?;
		let y = next()?;
		let z = u8::try_from(z).map_err(|_| invalid())?;

		let n = match meta {
			None => 1,
			Some(meta) => {
				let mut sizes = meta.splitn(2, '/').map(|p| {
					p.strip_prefix('+')
						.and_then(|p| p.parse::<u32>().ok())
						.ok_or_else(invalid)
				});
				let n1 = sizes.next().ok_or_else(invalid)??;
				let n2 = sizes.next().ok_or_else(invalid)??;
				ensure!(n1 == n2, invalid());
				n1
			}
		};

		if n == 1 {
			TileCoord::new(z, x, y)
		} else {
			TileCoord::new_metatile(z, x, y, n)
		}
	}
}

/// Orders by zoom level first, then `y`, then `x` (scanline order).
impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self
			.z
			.cmp(&other.z)
			.then(self.y.cmp(&other.y))
			.then(self.x.cmp(&other.x))
			.then(self.n.cmp(&other.n))
	}
}

impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn new_and_getters() {
		let coord = TileCoord::new(5, 3, 4).unwrap();
		assert_eq!((coord.z, coord.x, coord.y, coord.n), (5, 3, 4, 1));
		assert!(TileCoord::new(32, 0, 0).is_err());
	}

	#[test]
	fn metatile_validation() {
		assert!(TileCoord::new_metatile(3, 2, 4, 2).is_ok());
		assert!(TileCoord::new_metatile(3, 3, 4, 2).is_err());
		assert!(TileCoord::new_metatile(3, 2, 4, 0).is_err());
	}

	#[test]
	fn metatilecoord_floors_to_multiples() {
		let coord = TileCoord::new(5, 17, 23).unwrap();
		let meta = coord.metatilecoord(8).unwrap();
		assert_eq!(meta, TileCoord::new_metatile(5, 16, 16, 8).unwrap());
	}

	#[test]
	fn metatile_iter_members() {
		let meta = TileCoord::new_metatile(3, 2, 4, 2).unwrap();
		let tiles: Vec<TileCoord> = meta.iter().collect();
		assert_eq!(
			tiles,
			vec![
				TileCoord::new(3, 2, 4).unwrap(),
				TileCoord::new(3, 3, 4).unwrap(),
				TileCoord::new(3, 2, 5).unwrap(),
				TileCoord::new(3, 3, 5).unwrap(),
			]
		);
		for tile in tiles {
			assert_eq!(tile.metatilecoord(2).unwrap(), meta);
		}
	}

	#[rstest]
	#[case(3, 5, 6, "321")]
	#[case(0, 0, 0, "")]
	#[case(1, 1, 1, "3")]
	#[case(2, 0, 3, "22")]
	fn quadcode_cases(#[case] z: u8, #[case] x: u32, #[case] y: u32, #[case] expected: &str) {
		let coord = TileCoord::new(z, x, y).unwrap();
		assert_eq!(coord.quadcode(), expected);
		assert_eq!(TileCoord::from_quadcode(expected).unwrap(), coord);
	}

	#[test]
	fn quadcode_rejects_garbage() {
		assert!(TileCoord::from_quadcode("012a").is_err());
		assert!(TileCoord::from_quadcode("4").is_err());
	}

	#[rstest]
	#[case("5/6/7")]
	#[case("3/2/4:+2/+2")]
	#[case("0/0/0")]
	fn string_round_trip(#[case] s: &str) {
		let coord: TileCoord = s.parse().unwrap();
		assert_eq!(coord.to_string(), s);
	}

	#[rstest]
	#[case("5/6")]
	#[case("5/6/7/8")]
	#[case("a/b/c")]
	#[case("3/2/4:2/2")]
	#[case("3/2/4:+2/+3")]
	#[case("3/3/4:+2/+2")]
	fn parse_rejects(#[case] s: &str) {
		let result: Result<TileCoord> = s.parse();
		assert!(result.is_err(), "expected '{s}' to be rejected");
	}

	#[test]
	fn hash_interleaves_level() {
		let coord = TileCoord::new(3, 5, 6).unwrap();
		assert_eq!(coord.hash_value(), (5 << 3) ^ 6);
		let meta = TileCoord::new_metatile(3, 4, 6, 2).unwrap();
		assert_eq!(meta.hash_value(), (2 << 3) ^ 3);
	}

	#[test]
	fn scanline_order() {
		let mut coords = vec![
			TileCoord::new(2, 1, 1).unwrap(),
			TileCoord::new(1, 0, 0).unwrap(),
			TileCoord::new(2, 0, 1).unwrap(),
			TileCoord::new(2, 3, 0).unwrap(),
		];
		coords.sort();
		assert_eq!(
			coords,
			vec![
				TileCoord::new(1, 0, 0).unwrap(),
				TileCoord::new(2, 3, 0).unwrap(),
				TileCoord::new(2, 0, 1).unwrap(),
				TileCoord::new(2, 1, 1).unwrap(),
			]
		);
	}
}
