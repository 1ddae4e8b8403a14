//! A store that accepts and produces nothing.

use super::{StoreCapability, TileStore};
use crate::{stream::TileStream, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;

/// The no-op store: `get_one` hands the tile back untouched, `put_one` and
/// `delete_one` discard, `list` is empty.
///
/// Useful as a pipeline terminator and as a placeholder sink in dry runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTileStore;

#[async_trait]
impl TileStore for NullTileStore {
	fn name(&self) -> &str {
		"null"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, _tile: &Tile) -> Result<bool> {
		Ok(false)
	}

	async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
		Ok(Some(tile))
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		Ok(tile)
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		Ok(tile)
	}

	fn list(&self) -> Result<TileStream<'_>> {
		Ok(TileStream::new_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	#[tokio::test]
	async fn everything_is_a_no_op() {
		let store = NullTileStore;
		let tile = Tile::new(TileCoord::new(1, 0, 0).unwrap()).with_data(&b"x"[..]);

		assert!(!store.contains(&tile).await.unwrap());
		assert_eq!(store.get_one(tile.clone()).await.unwrap(), Some(tile.clone()));
		assert_eq!(store.put_one(tile.clone()).await.unwrap(), tile);
		assert_eq!(store.list().unwrap().count().await, 0);
	}
}
