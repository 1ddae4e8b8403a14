//! A single-zoom coverage mask.

use crate::formats;
use anyhow::{Result, ensure};
use async_trait::async_trait;
use enumset::EnumSet;
use image::{DynamicImage, GrayImage, Luma};
use parking_lot::Mutex;
use std::path::Path;
use tilecloud_core::{Blob, Bounds, StoreCapability, Tile, TileCoord, TileStore, TileStream};

/// Records which tiles of one zoom level were seen, one pixel per tile.
///
/// Putting a tile inside the bounds sets its pixel; tiles at other zoom
/// levels or outside the bounds pass through untouched. The mask renders as
/// a PNG where white marks coverage, pixel `(0, 0)` being the tile at
/// `(xmin, ymin)`.
pub struct MaskTileStore {
	z: u8,
	xbounds: Bounds,
	ybounds: Bounds,
	image: Mutex<GrayImage>,
}

impl MaskTileStore {
	pub fn new(z: u8, xbounds: Bounds, ybounds: Bounds) -> Result<MaskTileStore> {
		ensure!(
			!xbounds.is_empty() && !ybounds.is_empty(),
			"mask bounds must be non-empty"
		);
		Ok(MaskTileStore {
			z,
			xbounds,
			ybounds,
			image: Mutex::new(GrayImage::new(xbounds.len(), ybounds.len())),
		})
	}

	fn pixel(&self, coord: &TileCoord) -> Option<(u32, u32)> {
		if coord.z != self.z || !self.xbounds.contains(coord.x) || !self.ybounds.contains(coord.y) {
			return None;
		}
		let xmin = self.xbounds.start()?;
		let ymin = self.ybounds.start()?;
		Some((coord.x - xmin, coord.y - ymin))
	}

	/// The mask as an encoded PNG.
	pub fn to_blob(&self) -> Result<Blob> {
		let image = DynamicImage::ImageLuma8(self.image.lock().clone());
		formats::encode(&image, "image/png", None)
	}

	/// Writes the mask as a PNG file.
	pub fn save(&self, path: &Path) -> Result<()> {
		self.image.lock().save_with_format(path, image::ImageFormat::Png)?;
		Ok(())
	}
}

#[async_trait]
impl TileStore for MaskTileStore {
	fn name(&self) -> &str {
		"mask"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Put | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		match self.pixel(&tile.coord) {
			Some((x, y)) => Ok(self.image.lock().get_pixel(x, y).0[0] != 0),
			None => Ok(false),
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		if let Some((x, y)) = self.pixel(&tile.coord) {
			self.image.lock().put_pixel(x, y, Luma([255]));
		}
		Ok(tile)
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let image = self.image.lock();
		let xmin = self.xbounds.start().unwrap_or(0);
		let ymin = self.ybounds.start().unwrap_or(0);
		let coords: Vec<_> = image
			.enumerate_pixels()
			.filter(|(_, _, pixel)| pixel.0[0] != 0)
			.filter_map(|(x, y, _)| TileCoord::new(self.z, xmin + x, ymin + y).ok())
			.collect();
		Ok(TileStream::from_coords(coords))
	}
}
