//! Adaptive subdivision over a tile grid.

use super::{StoreCapability, TileStore};
use crate::{
	grid::TileGrid,
	stream::TileStream,
	types::{Tile, TileCoord},
};
use anyhow::Result;
use async_trait::async_trait;
use enumset::EnumSet;
use futures::stream;
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// A work queue that renders the world top-down, refining only where needed.
///
/// `list` drains the queue of coordinates to render (seeded with the grid
/// roots). After rendering a tile, `put_one` asks the `subdivide` predicate
/// whether the tile warrants more detail and, if so, enqueues its children
/// for a later `list` pass.
pub struct RenderingTheWorldTileStore {
	subdivide: Box<dyn Fn(&Tile) -> bool + Send + Sync>,
	grid: Arc<dyn TileGrid>,
	queue: Mutex<VecDeque<TileCoord>>,
}

impl RenderingTheWorldTileStore {
	/// Seeds the queue with the grid's root tiles.
	#[must_use]
	pub fn new(
		subdivide: Box<dyn Fn(&Tile) -> bool + Send + Sync>,
		grid: Arc<dyn TileGrid>,
	) -> RenderingTheWorldTileStore {
		let seeds = grid.roots();
		Self::with_seeds(subdivide, grid, seeds)
	}

	#[must_use]
	pub fn with_seeds(
		subdivide: Box<dyn Fn(&Tile) -> bool + Send + Sync>,
		grid: Arc<dyn TileGrid>,
		seeds: Vec<TileCoord>,
	) -> RenderingTheWorldTileStore {
		RenderingTheWorldTileStore {
			subdivide,
			grid,
			queue: Mutex::new(seeds.into()),
		}
	}

	/// Coordinates currently waiting to be rendered.
	#[must_use]
	pub fn pending(&self) -> usize {
		self.queue.lock().len()
	}
}

#[async_trait]
impl TileStore for RenderingTheWorldTileStore {
	fn name(&self) -> &str {
		"rendering_the_world"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Put | StoreCapability::List
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		if (self.subdivide)(&tile) {
			let mut queue = self.queue.lock();
			for child in self.grid.children(&tile.coord) {
				queue.push_back(child);
			}
		}
		Ok(tile)
	}

	/// Drains the queue, including coordinates enqueued while the stream is
	/// being consumed.
	fn list(&self) -> Result<TileStream<'_>> {
		Ok(TileStream::from_inner(stream::unfold(
			&self.queue,
			|queue| async move {
				let coord = queue.lock().pop_front();
				coord.map(|coord| (Tile::new(coord), queue))
			},
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grid::web_mercator;

	#[tokio::test]
	async fn subdivides_while_draining() {
		// Refine anything coarser than level 2.
		let store = RenderingTheWorldTileStore::new(
			Box::new(|tile: &Tile| tile.coord.z < 2),
			web_mercator(),
		);
		assert_eq!(store.pending(), 1);

		let mut rendered = Vec::new();
		let mut stream = store.list().unwrap();
		while let Some(tile) = stream.next().await {
			rendered.push(tile.coord);
			store.put_one(tile).await.unwrap();
		}

		// 1 root + 4 at level 1 + 16 at level 2, none deeper.
		assert_eq!(rendered.len(), 21);
		assert_eq!(rendered.iter().filter(|coord| coord.z == 2).count(), 16);
		assert_eq!(store.pending(), 0);
	}

	#[tokio::test]
	async fn explicit_seeds() {
		let seed = TileCoord::new(3, 2, 5).unwrap();
		let store = RenderingTheWorldTileStore::with_seeds(
			Box::new(|_| false),
			web_mercator(),
			vec![seed],
		);
		let tiles = store.list().unwrap().collect().await;
		assert_eq!(tiles.len(), 1);
		assert_eq!(tiles[0].coord, seed);
	}
}
