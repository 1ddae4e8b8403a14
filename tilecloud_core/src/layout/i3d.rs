//! The I3D quadcode path layout.

use super::TileLayout;
use crate::types::TileCoord;
use anyhow::Result;

/// Lays tiles out by their quadcode split into two-character path segments,
/// so a level-5 tile maps to `"DD/DD/D"`.
pub struct I3dTileLayout;

impl TileLayout for I3dTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		let quadcode = coord.quadcode();
		quadcode
			.as_bytes()
			.chunks(2)
			.map(String::from_utf8_lossy)
			.collect::<Vec<_>>()
			.join("/")
	}

	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		TileCoord::from_quadcode(&filename.replace('/', ""))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn segments_of_two() {
		let layout = I3dTileLayout;
		// quadcode of 3/5/6 is "321".
		assert_eq!(layout.filename(&TileCoord::new(3, 5, 6).unwrap()), "32/1");
		assert_eq!(layout.filename(&TileCoord::new(4, 11, 6).unwrap()), "12/31");
	}

	#[rstest]
	#[case(TileCoord::new(1, 1, 0).unwrap())]
	#[case(TileCoord::new(3, 5, 6).unwrap())]
	#[case(TileCoord::new(5, 27, 9).unwrap())]
	#[case(TileCoord::new(10, 1000, 17).unwrap())]
	fn round_trip(#[case] coord: TileCoord) {
		let layout = I3dTileLayout;
		assert_eq!(layout.tilecoord(&layout.filename(&coord)).unwrap(), coord);
	}

	#[test]
	fn rejects_non_digits() {
		assert!(I3dTileLayout.tilecoord("32/a1").is_err());
	}
}
