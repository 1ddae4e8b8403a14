//! Splitting rendered metatiles into unit tiles.

use crate::formats;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use futures::{StreamExt, stream};
use image::DynamicImage;
use tilecloud_core::{StoreCapability, Tile, TileCoord, TileStore, TileStream};

/// Splits each incoming metatile image into its unit tiles.
///
/// A metatile coord `(z, x·N, y·N, N)` carries one rendered image of
/// `N·tile_size` pixels per side, plus an optional `buffer` of extra pixels
/// on every edge. `get` crops the N² unit tiles out of it and re-encodes
/// them in the declared content type.
pub struct MetaTileSplitterTileStore {
	content_type: String,
	tile_size: u32,
	buffer: u32,
}

impl MetaTileSplitterTileStore {
	#[must_use]
	pub fn new(content_type: impl Into<String>, tile_size: u32, buffer: u32) -> MetaTileSplitterTileStore {
		MetaTileSplitterTileStore {
			content_type: content_type.into(),
			tile_size,
			buffer,
		}
	}

	fn split(&self, tile: Tile) -> Vec<Tile> {
		if tile.has_error() {
			return vec![tile];
		}
		let image = match tile.data.as_ref() {
			None => return vec![tile.with_error(anyhow!("metatile has no image data"))],
			Some(data) => match formats::decode(data, tile.content_type.as_deref()) {
				Ok(image) => image,
				Err(error) => return vec![tile.with_error(error.context("decoding metatile"))],
			},
		};

		let coord = tile.coord;
		let mut children = Vec::with_capacity((coord.n * coord.n) as usize);
		for i in 0..coord.n {
			for j in 0..coord.n {
				children.push(self.crop_child(&tile, &image, coord, i, j));
			}
		}
		children
	}

	fn crop_child(&self, tile: &Tile, image: &DynamicImage, coord: TileCoord, i: u32, j: u32) -> Tile {
		let crop = image.crop_imm(
			self.buffer + i * self.tile_size,
			self.buffer + j * self.tile_size,
			self.tile_size,
			self.tile_size,
		);
		let child_coord = match TileCoord::new(coord.z, coord.x + i, coord.y + j) {
			Ok(child_coord) => child_coord,
			Err(error) => return tile.clone().with_error(error),
		};
		let mut child = Tile::new(child_coord);
		child.metadata = tile.metadata.clone();
		match formats::encode(&crop, &self.content_type, None) {
			Ok(blob) => child.with_data(blob).with_content_type(self.content_type.clone()),
			Err(error) => child.with_error(error.context("encoding unit tile")),
		}
	}
}

#[async_trait]
impl TileStore for MetaTileSplitterTileStore {
	fn name(&self) -> &str {
		"metatile splitter"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get.into()
	}

	/// One metatile in, N² unit tiles out.
	fn get<'a>(&'a self, tiles: TileStream<'a>) -> Result<TileStream<'a>>
	where
		Self: Sized,
	{
		Ok(TileStream::from_inner(
			tiles.into_inner().flat_map(move |tile| stream::iter(self.split(tile))),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Rgb, RgbImage};

	/// A 2x2 metatile with 4px buffer; each quadrant gets its own color.
	fn metatile(tile_size: u32, buffer: u32) -> Tile {
		let side = 2 * tile_size + 2 * buffer;
		let image = RgbImage::from_fn(side, side, |x, y| {
			let i = u8::from(x >= buffer + tile_size);
			let j = u8::from(y >= buffer + tile_size);
			Rgb([i * 200, j * 200, 0])
		});
		Tile::new(TileCoord::new_metatile(3, 2, 4, 2).unwrap())
			.with_data(formats::encode(&DynamicImage::ImageRgb8(image), "image/png", None).unwrap())
			.with_content_type("image/png")
	}

	#[tokio::test]
	async fn splits_into_unit_tiles() {
		let splitter = MetaTileSplitterTileStore::new("image/png", 16, 4);
		let tiles = splitter
			.get(TileStream::from_vec(vec![metatile(16, 4)]))
			.unwrap()
			.collect()
			.await;

		assert_eq!(tiles.len(), 4);
		let coords: Vec<_> = tiles.iter().map(|tile| tile.coord).collect();
		assert!(coords.contains(&TileCoord::new(3, 2, 4).unwrap()));
		assert!(coords.contains(&TileCoord::new(3, 3, 5).unwrap()));

		for tile in &tiles {
			assert!(!tile.has_error());
			let image = formats::decode(tile.data.as_ref().unwrap(), Some("image/png")).unwrap();
			assert_eq!((image.width(), image.height()), (16, 16));
			// The crop must be color-uniform, buffers cut away.
			let rgb = image.to_rgb8();
			let first = rgb.get_pixel(0, 0);
			assert!(rgb.pixels().all(|pixel| pixel == first));
		}
	}

	#[tokio::test]
	async fn broken_metatile_is_annotated() {
		let splitter = MetaTileSplitterTileStore::new("image/png", 16, 0);
		let tile = Tile::new(TileCoord::new_metatile(1, 0, 0, 2).unwrap()).with_data(&b"junk"[..]);
		let tiles = splitter.get(TileStream::from_vec(vec![tile])).unwrap().collect().await;
		assert_eq!(tiles.len(), 1);
		assert!(tiles[0].has_error());
	}
}
