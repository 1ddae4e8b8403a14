//! Gzip transport encoding for tile payloads.

use crate::{pipeline::TileFilter, types::Blob, types::Tile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::{Compression, read::MultiGzDecoder, write::GzEncoder};
use std::io::{Read, Write};

pub(crate) fn compress_gzip(data: &[u8], level: Compression) -> Result<Blob> {
	let mut encoder = GzEncoder::new(Vec::new(), level);
	encoder.write_all(data)?;
	Ok(encoder.finish()?.into())
}

pub(crate) fn decompress_gzip(data: &[u8]) -> Result<Blob> {
	let mut decompressed = Vec::new();
	MultiGzDecoder::new(data)
		.read_to_end(&mut decompressed)
		.context("corrupt gzip payload")?;
	Ok(decompressed.into())
}

/// Gzips payloads that carry no `content_encoding` yet and marks them
/// `gzip`. Compression failures are annotated on the tile.
pub struct GzipCompressor {
	level: Compression,
}

impl GzipCompressor {
	#[must_use]
	pub fn new() -> GzipCompressor {
		GzipCompressor {
			level: Compression::default(),
		}
	}

	#[must_use]
	pub fn with_level(level: u32) -> GzipCompressor {
		GzipCompressor {
			level: Compression::new(level),
		}
	}
}

impl Default for GzipCompressor {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl TileFilter for GzipCompressor {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		if tile.content_encoding.is_none() {
			if let Some(data) = &tile.data {
				match compress_gzip(data.as_slice(), self.level) {
					Ok(compressed) => {
						tile.data = Some(compressed);
						tile.content_encoding = Some("gzip".to_string());
					}
					Err(error) => return Ok(Some(tile.with_error(error))),
				}
			}
		}
		Ok(Some(tile))
	}
}

/// Inflates `gzip`-encoded payloads and clears the `content_encoding`.
#[derive(Debug, Default)]
pub struct GzipDecompressor;

impl GzipDecompressor {
	#[must_use]
	pub fn new() -> GzipDecompressor {
		GzipDecompressor
	}
}

#[async_trait]
impl TileFilter for GzipDecompressor {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		if tile.content_encoding.as_deref() == Some("gzip") {
			if let Some(data) = &tile.data {
				match decompress_gzip(data.as_slice()) {
					Ok(decompressed) => {
						tile.data = Some(decompressed);
						tile.content_encoding = None;
					}
					Err(error) => return Ok(Some(tile.with_error(error))),
				}
			}
		}
		Ok(Some(tile))
	}
}
