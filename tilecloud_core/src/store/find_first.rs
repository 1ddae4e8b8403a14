//! A read-only store that cascades over several others.

use super::{StoreCapability, TileStore};
use crate::types::Tile;
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use std::sync::Arc;

/// Tries each wrapped store in order and returns the first hit.
///
/// Typical use: a fast cache in front of a slower canonical store. Only
/// reads; writes go to the wrapped stores directly.
pub struct FindFirstTileStore {
	stores: Vec<Arc<dyn TileStore>>,
}

impl FindFirstTileStore {
	#[must_use]
	pub fn new(stores: Vec<Arc<dyn TileStore>>) -> FindFirstTileStore {
		FindFirstTileStore { stores }
	}
}

#[async_trait]
impl TileStore for FindFirstTileStore {
	fn name(&self) -> &str {
		"find_first"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get.into()
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		for store in &self.stores {
			if store.contains(tile).await? {
				return Ok(true);
			}
		}
		Ok(false)
	}

	async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
		for store in &self.stores {
			if let Some(found) = store.get_one(tile.clone()).await? {
				return Ok(Some(found));
			}
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{store::MemoryTileStore, types::TileCoord};

	fn coord(z: u8, x: u32, y: u32) -> TileCoord {
		TileCoord::new(z, x, y).unwrap()
	}

	#[tokio::test]
	async fn returns_first_hit_in_order() {
		let first = Arc::new(MemoryTileStore::new());
		let second = Arc::new(MemoryTileStore::new());
		first
			.put_one(Tile::new(coord(2, 1, 1)).with_data(&b"first"[..]))
			.await
			.unwrap();
		second
			.put_one(Tile::new(coord(2, 1, 1)).with_data(&b"second"[..]))
			.await
			.unwrap();
		second
			.put_one(Tile::new(coord(2, 3, 1)).with_data(&b"only"[..]))
			.await
			.unwrap();

		let cascade = FindFirstTileStore::new(vec![first, second]);

		let hit = cascade.get_one(Tile::new(coord(2, 1, 1))).await.unwrap().unwrap();
		assert_eq!(hit.data.unwrap().as_slice(), b"first");

		let fallback = cascade.get_one(Tile::new(coord(2, 3, 1))).await.unwrap().unwrap();
		assert_eq!(fallback.data.unwrap().as_slice(), b"only");

		assert!(cascade.get_one(Tile::new(coord(2, 0, 0))).await.unwrap().is_none());
		assert!(cascade.contains(&Tile::new(coord(2, 3, 1))).await.unwrap());
	}
}
