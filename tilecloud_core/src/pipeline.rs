//! Demand-driven tile pipelines.
//!
//! A pipeline is a lazy stream of `Result<Tile>` built by chaining store
//! operations and filters onto a source; nothing runs until the terminal
//! [`consume`](Pipeline::consume) (or [`collect`](Pipeline::collect)) pulls.
//! Per-tile trouble travels in band on [`Tile::error`]; a stream-level `Err`
//! is an abort (threshold breach or caller mistake) and stops consumption.

use crate::{
	store::{StoreCapability, TileStore},
	stream::TileStream,
	types::{Tile, TileCoord},
};
use anyhow::Result;
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use std::sync::Arc;

/// A per-tile pipeline stage.
///
/// Returns the successor tile, `None` to drop it, or `Err` to abort the
/// whole pipeline.
#[async_trait]
pub trait TileFilter: Send + Sync {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>>;
}

/// A lazily evaluated chain of tile operations.
///
/// # Examples
///
/// ```
/// use tilecloud_core::{MemoryTileStore, Pipeline, TileCoord};
///
/// # async fn demo() -> anyhow::Result<()> {
/// let sink = MemoryTileStore::new();
/// let coords = (0..4).map(|x| TileCoord::new(2, x, 0).unwrap());
/// let consumed = Pipeline::from_coords(coords)
/// 	.map(|tile| tile.with_data(&b"tile"[..]))
/// 	.put(&sink)?
/// 	.consume(None)
/// 	.await?;
/// assert_eq!(consumed, 4);
/// assert_eq!(sink.len(), 4);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<'a> {
	stream: BoxStream<'a, Result<Tile>>,
}

impl<'a> Pipeline<'a> {
	#[must_use]
	pub fn from_stream(stream: TileStream<'a>) -> Pipeline<'a> {
		Pipeline {
			stream: stream.into_inner().map(Ok).boxed(),
		}
	}

	#[must_use]
	pub fn from_coords<I>(coords: I) -> Pipeline<'a>
	where
		I: IntoIterator<Item = TileCoord>,
		I::IntoIter: Send + 'a,
	{
		Self::from_stream(TileStream::from_coords(coords))
	}

	/// Starts from everything a store lists.
	///
	/// # Errors
	/// Fails when the store does not support `list`.
	pub fn list(store: &'a dyn TileStore) -> Result<Pipeline<'a>> {
		Ok(Self::from_stream(store.list()?))
	}

	/// Chains `get_one` against `store`: found tiles replace their inputs,
	/// misses are dropped.
	///
	/// # Errors
	/// Fails when the store does not support `get`.
	pub fn get(self, store: &'a dyn TileStore) -> Result<Pipeline<'a>> {
		store.require(StoreCapability::Get, "get")?;
		Ok(Pipeline {
			stream: self
				.stream
				.filter_map(move |item| async move {
					match item {
						Ok(tile) => {
							let fallback = tile.clone();
							match store.get_one(tile).await {
								Ok(Some(found)) => Some(Ok(found)),
								Ok(None) => None,
								Err(error) => Some(Ok(fallback.with_error(error))),
							}
						}
						Err(error) => Some(Err(error)),
					}
				})
				.boxed(),
		})
	}

	/// Chains `put_one` against `store`.
	///
	/// # Errors
	/// Fails when the store does not support `put`.
	pub fn put(self, store: &'a dyn TileStore) -> Result<Pipeline<'a>> {
		store.require(StoreCapability::Put, "put")?;
		Ok(Pipeline {
			stream: self
				.stream
				.then(move |item| async move {
					match item {
						Ok(tile) => {
							let fallback = tile.clone();
							match store.put_one(tile).await {
								Ok(tile) => Ok(tile),
								Err(error) => Ok(fallback.with_error(error)),
							}
						}
						Err(error) => Err(error),
					}
				})
				.boxed(),
		})
	}

	/// Chains `delete_one` against `store`.
	///
	/// # Errors
	/// Fails when the store does not support `delete`.
	pub fn delete(self, store: &'a dyn TileStore) -> Result<Pipeline<'a>> {
		store.require(StoreCapability::Delete, "delete")?;
		Ok(Pipeline {
			stream: self
				.stream
				.then(move |item| async move {
					match item {
						Ok(tile) => {
							let fallback = tile.clone();
							match store.delete_one(tile).await {
								Ok(tile) => Ok(tile),
								Err(error) => Ok(fallback.with_error(error)),
							}
						}
						Err(error) => Err(error),
					}
				})
				.boxed(),
		})
	}

	/// Applies a [`TileFilter`] stage.
	#[must_use]
	pub fn filter<F>(self, filter: F) -> Pipeline<'a>
	where
		F: TileFilter + 'a,
	{
		let filter = Arc::new(filter);
		Pipeline {
			stream: self
				.stream
				.filter_map(move |item| {
					let filter = filter.clone();
					async move {
						match item {
							Ok(tile) => filter.filter_tile(tile).await.transpose(),
							Err(error) => Some(Err(error)),
						}
					}
				})
				.boxed(),
		}
	}

	/// Applies a synchronous per-tile transformation.
	#[must_use]
	pub fn map<F>(self, mut f: F) -> Pipeline<'a>
	where
		F: FnMut(Tile) -> Tile + Send + 'a,
	{
		Pipeline {
			stream: self.stream.map(move |item| item.map(&mut f)).boxed(),
		}
	}

	/// The underlying stream, for custom terminals.
	#[must_use]
	pub fn into_stream(self) -> BoxStream<'a, Result<Tile>> {
		self.stream
	}

	/// Drains up to `limit` tiles (all when `None`), returning how many were
	/// consumed.
	///
	/// # Errors
	/// Propagates the first stream-level error, e.g.
	/// [`TooManyErrors`](crate::TooManyErrors) from an error-limit filter.
	pub async fn consume(mut self, limit: Option<usize>) -> Result<usize> {
		let mut consumed = 0;
		while limit.map_or(true, |limit| consumed < limit) {
			match self.stream.next().await {
				Some(item) => {
					item?;
					consumed += 1;
				}
				None => break,
			}
		}
		Ok(consumed)
	}

	/// Drains the pipeline into a vector.
	///
	/// # Errors
	/// Propagates the first stream-level error.
	pub async fn collect(mut self) -> Result<Vec<Tile>> {
		let mut tiles = Vec::new();
		while let Some(item) = self.stream.next().await {
			tiles.push(item?);
		}
		Ok(tiles)
	}
}
