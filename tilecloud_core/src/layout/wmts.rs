//! WMTS GetTile request layouts.

use super::TileLayout;
use crate::types::TileCoord;
use std::fmt::Write;

/// How the WMTS request is encoded into a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WmtsRequestEncoding {
	/// Key-value-pair query string.
	Kvp,
	/// RESTful path.
	Rest,
}

/// Builds WMTS `GetTile` URLs, in KVP or REST encoding. One-way: requests
/// are not parsed back into coordinates.
///
/// `format` is the MIME type for KVP requests and the dotted extension for
/// REST requests, matching how servers advertise the two encodings.
pub struct WmtsTileLayout {
	url: String,
	layer: String,
	style: String,
	format: String,
	tile_matrix_set: String,
	tile_matrix: Box<dyn Fn(u8) -> String + Send + Sync>,
	dimensions: Vec<(String, String)>,
	request_encoding: WmtsRequestEncoding,
}

impl WmtsTileLayout {
	#[must_use]
	pub fn new(
		url: impl Into<String>,
		layer: impl Into<String>,
		style: impl Into<String>,
		format: impl Into<String>,
		tile_matrix_set: impl Into<String>,
		dimensions: Vec<(String, String)>,
		request_encoding: WmtsRequestEncoding,
	) -> WmtsTileLayout {
		WmtsTileLayout {
			url: url.into(),
			layer: layer.into(),
			style: style.into(),
			format: format.into(),
			tile_matrix_set: tile_matrix_set.into(),
			tile_matrix: Box::new(|z| z.to_string()),
			dimensions,
			request_encoding,
		}
	}

	/// Replaces the default `z.to_string()` tile-matrix naming, for servers
	/// whose matrix identifiers are not plain zoom levels.
	#[must_use]
	pub fn with_tile_matrix(mut self, tile_matrix: Box<dyn Fn(u8) -> String + Send + Sync>) -> WmtsTileLayout {
		self.tile_matrix = tile_matrix;
		self
	}
}

impl TileLayout for WmtsTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		let tile_matrix = (self.tile_matrix)(coord.z);
		match self.request_encoding {
			WmtsRequestEncoding::Kvp => {
				let mut url = format!(
					"{}?Service=WMTS&Request=GetTile&Format={}&Version=1.0.0&Layer={}&Style={}",
					self.url, self.format, self.layer, self.style
				);
				for (name, value) in &self.dimensions {
					write!(url, "&{name}={value}").unwrap();
				}
				write!(
					url,
					"&TileMatrixSet={}&TileMatrix={}&TileRow={}&TileCol={}",
					self.tile_matrix_set, tile_matrix, coord.y, coord.x
				)
				.unwrap();
				url
			}
			WmtsRequestEncoding::Rest => {
				let mut url = format!("{}/1.0.0/{}/{}", self.url, self.layer, self.style);
				for (_, value) in &self.dimensions {
					write!(url, "/{value}").unwrap();
				}
				write!(
					url,
					"/{}/{}/{}/{}{}",
					self.tile_matrix_set, tile_matrix, coord.y, coord.x, self.format
				)
				.unwrap();
				url
			}
		}
	}
}
