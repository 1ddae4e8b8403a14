//! Re-encoding of tiles into a target image format.

use crate::formats;
use anyhow::Result;
use async_trait::async_trait;
use tilecloud_core::{Tile, TileFilter};

/// Converts tile images to `content_type` when they declare a different one.
///
/// Tiles already in the target format, without data, or already carrying an
/// error pass through untouched. Decode/encode failures are annotated on the
/// tile.
pub struct ImageFormatConverter {
	content_type: String,
	quality: Option<u8>,
}

impl ImageFormatConverter {
	#[must_use]
	pub fn new(content_type: impl Into<String>) -> ImageFormatConverter {
		ImageFormatConverter {
			content_type: content_type.into(),
			quality: None,
		}
	}

	/// JPEG quality (0..=99) used when the target format is lossy.
	#[must_use]
	pub fn with_quality(mut self, quality: u8) -> ImageFormatConverter {
		self.quality = Some(quality);
		self
	}
}

#[async_trait]
impl TileFilter for ImageFormatConverter {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		if tile.has_error() || tile.content_type.as_deref() == Some(self.content_type.as_str()) {
			return Ok(Some(tile));
		}
		let converted = match tile.data.as_ref() {
			None => return Ok(Some(tile)),
			Some(data) => formats::decode(data, tile.content_type.as_deref())
				.and_then(|image| formats::encode(&image, &self.content_type, self.quality)),
		};
		match converted {
			Ok(blob) => {
				tile.data = Some(blob);
				tile.content_type = Some(self.content_type.clone());
				Ok(Some(tile))
			}
			Err(error) => Ok(Some(
				tile.with_error(error.context(format!("converting to {}", self.content_type))),
			)),
		}
	}
}
