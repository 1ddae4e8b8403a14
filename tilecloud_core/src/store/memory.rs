//! An in-memory tile store backed by an ordered map.

use super::{StoreCapability, TileStore};
use crate::{
	stream::TileStream,
	types::{Tile, TileCoord},
};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Keeps every tile in process memory, keyed and listed by coordinate.
///
/// Mostly useful in tests and as a staging sink; `list` yields coordinates in
/// `(z, y, x)` order.
#[derive(Default)]
pub struct MemoryTileStore {
	tiles: RwLock<BTreeMap<TileCoord, Tile>>,
}

impl MemoryTileStore {
	#[must_use]
	pub fn new() -> MemoryTileStore {
		MemoryTileStore::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.tiles.read().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.tiles.read().is_empty()
	}
}

#[async_trait]
impl TileStore for MemoryTileStore {
	fn name(&self) -> &str {
		"memory"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		Ok(self.tiles.read().contains_key(&tile.coord))
	}

	async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
		Ok(self.tiles.read().get(&tile.coord).cloned())
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		self.tiles.write().insert(tile.coord, tile.clone());
		Ok(tile)
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		self.tiles.write().remove(&tile.coord);
		Ok(tile)
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let coords: Vec<TileCoord> = self.tiles.read().keys().copied().collect();
		Ok(TileStream::from_coords(coords))
	}
}
