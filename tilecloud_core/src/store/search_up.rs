//! A store that falls back to ancestor tiles.

use super::{StoreCapability, TileStore};
use crate::{grid::TileGrid, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use std::sync::Arc;

/// Walks up the grid's parent chain until the wrapped store has a tile,
/// returning its data under the originally requested coordinate.
///
/// Used to serve coarse imagery where fine levels have not been generated
/// yet. The caller sees the coord it asked for; only the payload comes from
/// the ancestor.
pub struct SearchUpTileStore {
	store: Arc<dyn TileStore>,
	grid: Arc<dyn TileGrid>,
}

impl SearchUpTileStore {
	#[must_use]
	pub fn new(store: Arc<dyn TileStore>, grid: Arc<dyn TileGrid>) -> SearchUpTileStore {
		SearchUpTileStore { store, grid }
	}
}

#[async_trait]
impl TileStore for SearchUpTileStore {
	fn name(&self) -> &str {
		"search_up"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get.into()
	}

	async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
		let requested = tile.coord;
		let mut probe = Some(requested);
		while let Some(coord) = probe {
			if let Some(mut found) = self.store.get_one(Tile::new(coord)).await? {
				found.coord = requested;
				return Ok(Some(found));
			}
			probe = self.grid.parent(&coord);
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{grid::web_mercator, store::MemoryTileStore, types::TileCoord};

	#[tokio::test]
	async fn falls_back_to_nearest_ancestor() {
		let inner = Arc::new(MemoryTileStore::new());
		inner
			.put_one(Tile::new(TileCoord::new(1, 1, 0).unwrap()).with_data(&b"coarse"[..]))
			.await
			.unwrap();

		let store = SearchUpTileStore::new(inner, web_mercator());

		// 3/5/2 -> 2/2/1 -> 1/1/0 is the first ancestor present.
		let requested = TileCoord::new(3, 5, 2).unwrap();
		let found = store.get_one(Tile::new(requested)).await.unwrap().unwrap();
		assert_eq!(found.coord, requested);
		assert_eq!(found.data.unwrap().as_slice(), b"coarse");

		// 3/7/7 has no ancestor under 1/1/0.
		let miss = store.get_one(Tile::new(TileCoord::new(3, 7, 7).unwrap())).await.unwrap();
		assert!(miss.is_none());
	}

	#[tokio::test]
	async fn exact_hit_short_circuits() {
		let inner = Arc::new(MemoryTileStore::new());
		let coord = TileCoord::new(4, 3, 9).unwrap();
		inner
			.put_one(Tile::new(coord).with_data(&b"exact"[..]))
			.await
			.unwrap();

		let store = SearchUpTileStore::new(inner, web_mercator());
		let found = store.get_one(Tile::new(coord)).await.unwrap().unwrap();
		assert_eq!(found.data.unwrap().as_slice(), b"exact");
	}
}
