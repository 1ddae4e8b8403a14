//! Layouts: reversible mappings between tile coordinates and string keys.
//!
//! A layout turns a [`TileCoord`] into the key a backend stores it under (a
//! file path, an object key, a URL) and, where the mapping is reversible,
//! parses such a key back. Request layouts (WMS, WMTS) are one-way.

mod i3d;
mod template;
mod tilecache;
mod wms;
mod wmts;

pub use i3d::I3dTileLayout;
pub use template::TemplateTileLayout;
pub use tilecache::TileCacheDiskLayout;
pub use wms::WmsTileLayout;
pub use wmts::{WmtsRequestEncoding, WmtsTileLayout};

use crate::{error::ParseError, types::TileCoord};
use anyhow::{Result, bail};

/// A bijection (over its domain) between tile coordinates and string keys.
///
/// The round trip `tilecoord(filename(coord)) == coord` holds for every
/// coordinate in the layout's domain; one-way layouts fail on
/// [`tilecoord`](Self::tilecoord).
pub trait TileLayout: Send + Sync {
	/// The key for `coord`.
	fn filename(&self, coord: &TileCoord) -> String;

	/// Parses a key produced by [`filename`](Self::filename).
	///
	/// # Errors
	/// Returns a [`ParseError`] when the key is not in the layout's image, or
	/// another error when the layout is one-way.
	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		bail!("layout cannot parse '{filename}': write-only layout")
	}
}

/// The slippy-map layout `z/x/y` with an optional fixed extension.
pub struct OsmTileLayout {
	extension: String,
}

impl OsmTileLayout {
	#[must_use]
	pub fn new() -> OsmTileLayout {
		OsmTileLayout {
			extension: String::new(),
		}
	}

	/// With a trailing extension, e.g. `".png"`.
	#[must_use]
	pub fn with_extension(extension: impl Into<String>) -> OsmTileLayout {
		OsmTileLayout {
			extension: extension.into(),
		}
	}
}

impl Default for OsmTileLayout {
	fn default() -> Self {
		Self::new()
	}
}

impl TileLayout for OsmTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		format!("{}/{}/{}{}", coord.z, coord.x, coord.y, self.extension)
	}

	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		let stripped = filename
			.strip_suffix(&self.extension)
			.ok_or_else(|| ParseError::new(format!("'{filename}' lacks extension '{}'", self.extension)))?;
		stripped.parse()
	}
}

/// Wraps another layout between a fixed prefix and suffix.
pub struct WrappedTileLayout {
	layout: Box<dyn TileLayout>,
	prefix: String,
	suffix: String,
}

impl WrappedTileLayout {
	#[must_use]
	pub fn new(
		layout: Box<dyn TileLayout>,
		prefix: impl Into<String>,
		suffix: impl Into<String>,
	) -> WrappedTileLayout {
		WrappedTileLayout {
			layout,
			prefix: prefix.into(),
			suffix: suffix.into(),
		}
	}

	#[must_use]
	pub fn prefix(&self) -> &str {
		&self.prefix
	}
}

impl TileLayout for WrappedTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		format!("{}{}{}", self.prefix, self.layout.filename(coord), self.suffix)
	}

	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		let inner = filename
			.strip_prefix(&self.prefix)
			.and_then(|rest| rest.strip_suffix(&self.suffix))
			.ok_or_else(|| {
				ParseError::new(format!(
					"'{filename}' does not match '{}…{}'",
					self.prefix, self.suffix
				))
			})?;
		self.layout.tilecoord(inner)
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
	fn osm_layout() {
		let layout = OsmTileLayout::new();
		assert_eq!(layout.filename(&coord(3, 1, 2)), "3/1/2");
		assert_eq!(layout.tilecoord("3/1/2").unwrap(), coord(3, 1, 2));
	}

	#[rstest]
	#[case(coord(0, 0, 0))]
	#[case(coord(5, 9, 13))]
	#[case(coord(18, 137167, 92345))]
	fn osm_round_trip(#[case] coord: TileCoord) {
		let layout = OsmTileLayout::with_extension(".png");
		assert_eq!(layout.tilecoord(&layout.filename(&coord)).unwrap(), coord);
	}

	#[test]
	fn osm_rejects_wrong_extension() {
		let layout = OsmTileLayout::with_extension(".png");
		let err = layout.tilecoord("3/1/2.jpeg").unwrap_err();
		assert!(err.downcast_ref::<ParseError>().is_some());
	}

	#[test]
	fn wrapped_round_trip() {
		let layout = WrappedTileLayout::new(Box::new(OsmTileLayout::new()), "tiles/", ".webp");
		assert_eq!(layout.filename(&coord(2, 1, 3)), "tiles/2/1/3.webp");
		assert_eq!(layout.tilecoord("tiles/2/1/3.webp").unwrap(), coord(2, 1, 3));
		assert!(layout.tilecoord("other/2/1/3.webp").is_err());
	}
}
