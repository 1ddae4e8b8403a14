//! The TileCache disk layout.

use super::TileLayout;
use crate::{error::ParseError, types::TileCoord};
use anyhow::Result;

/// The deep-nested on-disk layout of TileCache:
/// `ZZ/XXX/XXX/XXX/YYY/YYY/YYY`, with `z` zero-padded to two digits and `x`
/// and `y` to nine, chunked in threes.
pub struct TileCacheDiskLayout;

impl TileCacheDiskLayout {
	fn chunks(value: u32) -> [String; 3] {
		let padded = format!("{value:09}");
		[
			padded[0..3].to_string(),
			padded[3..6].to_string(),
			padded[6..9].to_string(),
		]
	}
}

impl TileLayout for TileCacheDiskLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		let [x0, x1, x2] = Self::chunks(coord.x);
		let [y0, y1, y2] = Self::chunks(coord.y);
		format!("{:02}/{x0}/{x1}/{x2}/{y0}/{y1}/{y2}", coord.z)
	}

	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		let invalid = || ParseError::new(format!("'{filename}' is not a TileCache path"));
		let parts: Vec<&str> = filename.split('/').collect();
		if parts.len() != 7 || parts[0].len() != 2 || parts[1..].iter().any(|part| part.len() != 3) {
			return Err(invalid().into());
		}
		let z: u8 = parts[0].parse().map_err(|_| invalid())?;
		let x: u32 = parts[1..4].concat().parse().map_err(|_| invalid())?;
		let y: u32 = parts[4..7].concat().parse().map_err(|_| invalid())?;
		TileCoord::new(z, x, y)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn padded_and_chunked() {
		let layout = TileCacheDiskLayout;
		let coord = TileCoord::new(5, 17, 1296).unwrap();
		assert_eq!(layout.filename(&coord), "05/000/000/017/000/001/296");
	}

	#[rstest]
	#[case(TileCoord::new(0, 0, 0).unwrap())]
	#[case(TileCoord::new(5, 17, 1296).unwrap())]
	#[case(TileCoord::new(30, 123_456_789, 987_654_321).unwrap())]
	fn round_trip(#[case] coord: TileCoord) {
		let layout = TileCacheDiskLayout;
		assert_eq!(layout.tilecoord(&layout.filename(&coord)).unwrap(), coord);
	}

	#[rstest]
	#[case("5/000/000/017/000/001/296")]
	#[case("05/000/000/017/000/001")]
	#[case("05/000/000/17/000/001/296")]
	#[case("aa/000/000/017/000/001/296")]
	fn rejects_malformed(#[case] filename: &str) {
		assert!(TileCacheDiskLayout.tilecoord(filename).is_err());
	}
}
