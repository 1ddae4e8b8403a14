//! The tile store contract and the backend-free store implementations.

mod bounding_pyramid;
mod find_first;
mod memory;
mod null;
mod rendering_the_world;
mod search_up;

pub use bounding_pyramid::BoundingPyramidTileStore;
pub use find_first::FindFirstTileStore;
pub use memory::MemoryTileStore;
pub use null::NullTileStore;
pub use rendering_the_world::RenderingTheWorldTileStore;
pub use search_up::SearchUpTileStore;

use crate::{
	error::UnsupportedOperation,
	stream::TileStream,
	types::{BoundingPyramid, Tile},
};
use anyhow::{Result, ensure};
use async_trait::async_trait;
use enumset::{EnumSet, EnumSetType};

/// The operations a store implements.
///
/// Streaming methods check the set up front so that a pipeline wired to a
/// store missing an operation fails at construction, not per tile.
#[derive(EnumSetType, Debug)]
pub enum StoreCapability {
	Get,
	Put,
	Delete,
	List,
}

/// A source and/or sink of tiles.
///
/// Every operation is optional: a store declares what it supports through
/// [`capabilities`](Self::capabilities) and inherits failing defaults for the
/// rest. The `_one` methods move the tile through and hand it back so calls
/// compose inside stream combinators.
///
/// Error discipline: a per-tile backend failure never surfaces as `Err`. The
/// store annotates the tile via [`Tile::with_error`] and returns it, so one
/// bad tile cannot abort a stream. `Err` is reserved for
/// [`UnsupportedOperation`] and caller mistakes.
#[async_trait]
pub trait TileStore: Send + Sync {
	/// Short name used in logs and error messages.
	fn name(&self) -> &str;

	fn capabilities(&self) -> EnumSet<StoreCapability>;

	/// Whether a tile exists at `tile.coord`.
	///
	/// The default probes with [`get_one`](Self::get_one).
	async fn contains(&self, tile: &Tile) -> Result<bool> {
		self.require(StoreCapability::Get, "contains")?;
		Ok(self.get_one(Tile::new(tile.coord)).await?.is_some())
	}

	/// Fetches the payload for `tile.coord`; `None` when the store has no
	/// tile there.
	async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
		drop(tile);
		Err(UnsupportedOperation::new(self.name(), "get_one").into())
	}

	/// Persists the tile's payload and returns the tile.
	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		drop(tile);
		Err(UnsupportedOperation::new(self.name(), "put_one").into())
	}

	/// Removes the tile's key and returns the tile.
	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		drop(tile);
		Err(UnsupportedOperation::new(self.name(), "delete_one").into())
	}

	/// All tiles of the store, coordinates only; `data` is not guaranteed.
	fn list(&self) -> Result<TileStream<'_>> {
		Err(UnsupportedOperation::new(self.name(), "list").into())
	}

	/// The pyramid of stored coordinates, when the backend can compute it
	/// without a full scan (e.g. by SQL aggregation).
	async fn get_cheap_bounding_pyramid(&self) -> Result<Option<BoundingPyramid>> {
		Ok(None)
	}

	/// The pyramid of stored coordinates, scanning [`list`](Self::list) when
	/// no cheap path exists.
	async fn get_bounding_pyramid(&self) -> Result<BoundingPyramid> {
		if let Some(pyramid) = self.get_cheap_bounding_pyramid().await? {
			return Ok(pyramid);
		}
		let mut pyramid = BoundingPyramid::new();
		let mut stream = self.list()?;
		while let Some(tile) = stream.next().await {
			pyramid.add(&tile.coord);
		}
		Ok(pyramid)
	}

	/// Maps [`get_one`](Self::get_one) across a stream, dropping misses and
	/// preserving order.
	fn get<'a>(&'a self, stream: TileStream<'a>) -> Result<TileStream<'a>>
	where
		Self: Sized,
	{
		self.require(StoreCapability::Get, "get")?;
		Ok(stream.filter_map_async(move |tile| async move {
			let fallback = tile.clone();
			match self.get_one(tile).await {
				Ok(found) => found,
				Err(error) => Some(fallback.with_error(error)),
			}
		}))
	}

	/// [`list`](Self::list) with payloads attached in one pass.
	fn get_all(&self) -> Result<TileStream<'_>>
	where
		Self: Sized,
	{
		self.get(self.list()?)
	}

	/// Maps [`put_one`](Self::put_one) across a stream, preserving order.
	fn put<'a>(&'a self, stream: TileStream<'a>) -> Result<TileStream<'a>>
	where
		Self: Sized,
	{
		self.require(StoreCapability::Put, "put")?;
		Ok(stream.filter_map_async(move |tile| async move {
			let fallback = tile.clone();
			match self.put_one(tile).await {
				Ok(tile) => Some(tile),
				Err(error) => Some(fallback.with_error(error)),
			}
		}))
	}

	/// Maps [`delete_one`](Self::delete_one) across a stream, preserving
	/// order.
	fn delete<'a>(&'a self, stream: TileStream<'a>) -> Result<TileStream<'a>>
	where
		Self: Sized,
	{
		self.require(StoreCapability::Delete, "delete")?;
		Ok(stream.filter_map_async(move |tile| async move {
			let fallback = tile.clone();
			match self.delete_one(tile).await {
				Ok(tile) => Some(tile),
				Err(error) => Some(fallback.with_error(error)),
			}
		}))
	}

	/// Fails with [`UnsupportedOperation`] unless `capability` is declared.
	fn require(&self, capability: StoreCapability, operation: &str) -> Result<()> {
		ensure!(
			self.capabilities().contains(capability),
			UnsupportedOperation::new(self.name(), operation)
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	struct Listless;

	#[async_trait]
	impl TileStore for Listless {
		fn name(&self) -> &str {
			"listless"
		}

		fn capabilities(&self) -> EnumSet<StoreCapability> {
			StoreCapability::Get.into()
		}

		async fn get_one(&self, tile: Tile) -> Result<Option<Tile>> {
			Ok(Some(tile.with_data(&b"payload"[..])))
		}
	}

	#[tokio::test]
	async fn defaults_fail_with_unsupported_operation() {
		let store = Listless;
		let tile = Tile::new(TileCoord::new(1, 0, 0).unwrap());

		let err = store.put_one(tile.clone()).await.unwrap_err();
		let unsupported = err.downcast_ref::<UnsupportedOperation>().unwrap();
		assert_eq!(unsupported.operation, "put_one");

		assert!(store.list().is_err());
		assert!(store.put(TileStream::new_empty()).is_err());
		assert!(store.delete(TileStream::new_empty()).is_err());
	}

	#[tokio::test]
	async fn streaming_get_maps_get_one() {
		let store = Listless;
		let coords = vec![TileCoord::new(2, 0, 0).unwrap(), TileCoord::new(2, 1, 0).unwrap()];
		let tiles = store.get(TileStream::from_coords(coords)).unwrap().collect().await;
		assert_eq!(tiles.len(), 2);
		assert!(tiles.iter().all(|tile| tile.data_len() == 7));
	}

	#[tokio::test]
	async fn contains_probes_get_one() {
		let store = Listless;
		let tile = Tile::new(TileCoord::new(3, 4, 5).unwrap());
		assert!(store.contains(&tile).await.unwrap());
	}
}
