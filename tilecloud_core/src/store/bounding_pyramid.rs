//! A store whose contents are a bounding pyramid, not tile data.

use super::{StoreCapability, TileStore};
use crate::{
	stream::TileStream,
	types::{BoundingPyramid, Tile, TileCoord},
};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use parking_lot::RwLock;

/// Serves a [`BoundingPyramid`] as a tile source and accumulates one as a
/// sink.
///
/// `list` enumerates every coordinate of the pyramid (coarsest level first,
/// no data); `put_one` extends the pyramid with the tile's coordinate and
/// passes the tile through unchanged.
pub struct BoundingPyramidTileStore {
	pyramid: RwLock<BoundingPyramid>,
}

impl BoundingPyramidTileStore {
	/// An empty accumulator on the web-mercator grid.
	#[must_use]
	pub fn new() -> BoundingPyramidTileStore {
		Self::from_pyramid(BoundingPyramid::new())
	}

	#[must_use]
	pub fn from_pyramid(pyramid: BoundingPyramid) -> BoundingPyramidTileStore {
		BoundingPyramidTileStore {
			pyramid: RwLock::new(pyramid),
		}
	}

	/// A snapshot of the current pyramid.
	#[must_use]
	pub fn pyramid(&self) -> BoundingPyramid {
		self.pyramid.read().clone()
	}
}

impl Default for BoundingPyramidTileStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl TileStore for BoundingPyramidTileStore {
	fn name(&self) -> &str {
		"bounding_pyramid"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Put | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		Ok(self.pyramid.read().contains(&tile.coord))
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		self.pyramid.write().add(&tile.coord);
		Ok(tile)
	}

	fn list(&self) -> Result<TileStream<'_>> {
		// Snapshot the level bounds so the stream does not hold the lock.
		let snapshot = self.pyramid.read().clone();
		let levels: Vec<(u8, crate::Bounds, crate::Bounds)> = snapshot
			.zs()
			.filter_map(|z| snapshot.bounds(z).map(|&(x, y)| (z, x, y)))
			.collect();
		let coords = levels.into_iter().flat_map(|(z, x, y)| {
			y.iter()
				.flat_map(move |y| x.iter().map(move |x| TileCoord { z, x, y, n: 1 }))
		});
		Ok(TileStream::from_coords(coords))
	}

	async fn get_cheap_bounding_pyramid(&self) -> Result<Option<BoundingPyramid>> {
		Ok(Some(self.pyramid()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn lists_every_coord_of_the_pyramid() {
		let pyramid: BoundingPyramid = "0/0/0:1/*/*".parse().unwrap();
		let store = BoundingPyramidTileStore::from_pyramid(pyramid);
		let tiles = store.list().unwrap().collect().await;
		assert_eq!(tiles.len(), 5);
		assert_eq!(tiles[0].coord, TileCoord::new(0, 0, 0).unwrap());
	}

	#[tokio::test]
	async fn accumulates_on_put() {
		let store = BoundingPyramidTileStore::new();
		let tile = Tile::new(TileCoord::new(5, 9, 13).unwrap());
		assert!(!store.contains(&tile).await.unwrap());

		store.put_one(tile.clone()).await.unwrap();
		assert!(store.contains(&tile).await.unwrap());
		assert_eq!(store.pyramid().count(), 1);

		let cheap = store.get_cheap_bounding_pyramid().await.unwrap().unwrap();
		assert_eq!(cheap, store.pyramid());
	}
}
