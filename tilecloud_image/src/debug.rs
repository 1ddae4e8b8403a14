//! Synthesized tiles that show their own coordinate.

use crate::{font, formats};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use image::{DynamicImage, Rgba, RgbaImage};
use tilecloud_core::{StoreCapability, Tile, TileStore};

/// Produces a PNG for every requested coordinate, labelled with `z/x/y` and
/// framed with a border, for visually checking tile wiring.
pub struct DebugTileStore {
	tile_size: u32,
	scale: u32,
}

impl DebugTileStore {
	#[must_use]
	pub fn new() -> DebugTileStore {
		DebugTileStore {
			tile_size: 256,
			scale: 4,
		}
	}

	#[must_use]
	pub fn with_tile_size(mut self, tile_size: u32) -> DebugTileStore {
		self.tile_size = tile_size;
		self
	}

	fn render(&self, tile: &Tile) -> Result<DynamicImage> {
		let size = self.tile_size;
		let mut image = RgbaImage::new(size, size);
		let line = Rgba([128, 128, 128, 255]);
		for i in 0..size {
			image.put_pixel(i, 0, line);
			image.put_pixel(0, i, line);
		}
		let coord = tile.coord;
		let label = format!("{}/{}/{}", coord.z, coord.x, coord.y);
		font::draw_text(&mut image, 2 * self.scale, 2 * self.scale, self.scale, &label, Rgba([0, 0, 0, 255]));
		Ok(DynamicImage::ImageRgba8(image))
	}
}

impl Default for DebugTileStore {
	fn default() -> DebugTileStore {
		DebugTileStore::new()
	}
}

#[async_trait]
impl TileStore for DebugTileStore {
	fn name(&self) -> &str {
		"debug"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get.into()
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let image = self.render(&tile)?;
		tile.data = Some(formats::encode(&image, "image/png", None)?);
		tile.content_type = Some("image/png".to_string());
		Ok(Some(tile))
	}
}
