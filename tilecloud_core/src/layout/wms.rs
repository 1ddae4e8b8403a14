//! WMS GetMap request layout.

use super::TileLayout;
use crate::{grid::TileGrid, types::TileCoord};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::{fmt::Write, sync::Arc};

// Characters that would break a query-string value; commas stay readable so
// BBOX keeps its standard shape.
const QUERY_VALUE: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'&')
	.add(b'+')
	.add(b'=')
	.add(b'?');

/// Builds WMS `GetMap` URLs from the grid extent of each tile. One-way.
///
/// `WIDTH` and `HEIGHT` are `n * tile_size + 2 * border` pixels so metatiles
/// and buffered requests come out at their natural size;
/// `TRANSPARENT=TRUE` is sent exactly when the format is PNG.
pub struct WmsTileLayout {
	url: String,
	layers: String,
	srs: String,
	format: String,
	grid: Arc<dyn TileGrid>,
	tile_size: u32,
	border: u32,
}

impl WmsTileLayout {
	#[must_use]
	pub fn new(
		url: impl Into<String>,
		layers: impl Into<String>,
		srs: impl Into<String>,
		format: impl Into<String>,
		grid: Arc<dyn TileGrid>,
		tile_size: u32,
		border: u32,
	) -> WmsTileLayout {
		WmsTileLayout {
			url: url.into(),
			layers: layers.into(),
			srs: srs.into(),
			format: format.into(),
			grid,
			tile_size,
			border,
		}
	}
}

impl TileLayout for WmsTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		let extent = self.grid.extent(coord, f64::from(self.border));
		let size = coord.n * self.tile_size + 2 * self.border;
		let transparent = if self.format == "image/png" { "TRUE" } else { "FALSE" };

		let mut url = format!("{}?SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap", self.url);
		for (name, value) in [
			("LAYERS", self.layers.as_str()),
			("FORMAT", self.format.as_str()),
			("TRANSPARENT", transparent),
			("SRS", self.srs.as_str()),
			("BBOX", &extent.to_bbox_string()),
			("WIDTH", &size.to_string()),
			("HEIGHT", &size.to_string()),
		] {
			write!(url, "&{name}={}", utf8_percent_encode(value, QUERY_VALUE)).unwrap();
		}
		url
	}
}
