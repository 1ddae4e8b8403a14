//! An async stream of tiles.
//!
//! All bulk store operations produce and consume a [`TileStream`]: a boxed
//! async stream of [`Tile`]s. Per-tile failures travel in band as error
//! annotations on the tile, so the stream item is a plain `Tile`, not a
//! `Result`.

use crate::types::{Tile, TileCoord};
use futures::{Stream, StreamExt, stream::BoxStream};
use std::future::Future;

/// A boxed async stream of tiles.
///
/// # Examples
///
/// ```
/// use tilecloud_core::{TileCoord, TileStream};
///
/// let stream = TileStream::from_coords(vec![
/// 	TileCoord::new(1, 0, 0).unwrap(),
/// 	TileCoord::new(1, 1, 0).unwrap(),
/// ]);
/// let count = futures::executor::block_on(stream.count());
/// assert_eq!(count, 2);
/// ```
pub struct TileStream<'a> {
	stream: BoxStream<'a, Tile>,
}

impl<'a> TileStream<'a> {
	/// A stream yielding no tiles.
	#[must_use]
	pub fn new_empty() -> TileStream<'a> {
		TileStream {
			stream: futures::stream::empty().boxed(),
		}
	}

	/// Wraps an already boxed stream.
	#[must_use]
	pub fn from_stream(stream: BoxStream<'a, Tile>) -> TileStream<'a> {
		TileStream { stream }
	}

	/// Boxes and wraps any tile stream.
	#[must_use]
	pub fn from_inner<S>(stream: S) -> TileStream<'a>
	where
		S: Stream<Item = Tile> + Send + 'a,
	{
		TileStream { stream: stream.boxed() }
	}

	#[must_use]
	pub fn from_vec(tiles: Vec<Tile>) -> TileStream<'a> {
		TileStream {
			stream: futures::stream::iter(tiles).boxed(),
		}
	}

	/// A stream of bare tiles, one per coordinate.
	#[must_use]
	pub fn from_coords<I>(coords: I) -> TileStream<'a>
	where
		I: IntoIterator<Item = TileCoord>,
		I::IntoIter: Send + 'a,
	{
		TileStream {
			stream: futures::stream::iter(coords.into_iter().map(Tile::new)).boxed(),
		}
	}

	/// The underlying boxed stream, for custom combinators.
	#[must_use]
	pub fn into_inner(self) -> BoxStream<'a, Tile> {
		self.stream
	}

	pub async fn next(&mut self) -> Option<Tile> {
		self.stream.next().await
	}

	/// Applies a synchronous transformation to every tile.
	#[must_use]
	pub fn map<F>(self, f: F) -> TileStream<'a>
	where
		F: FnMut(Tile) -> Tile + Send + 'a,
	{
		TileStream {
			stream: self.stream.map(f).boxed(),
		}
	}

	/// Keeps the tiles for which `f` returns `Some`.
	#[must_use]
	pub fn filter_map<F>(self, mut f: F) -> TileStream<'a>
	where
		F: FnMut(Tile) -> Option<Tile> + Send + 'a,
	{
		TileStream {
			stream: self
				.stream
				.filter_map(move |tile| futures::future::ready(f(tile)))
				.boxed(),
		}
	}

	/// Keeps the tiles for which an async `f` returns `Some`.
	#[must_use]
	pub fn filter_map_async<F, Fut>(self, f: F) -> TileStream<'a>
	where
		F: FnMut(Tile) -> Fut + Send + 'a,
		Fut: Future<Output = Option<Tile>> + Send + 'a,
	{
		TileStream {
			stream: self.stream.filter_map(f).boxed(),
		}
	}

	/// Truncates the stream after `limit` tiles.
	#[must_use]
	pub fn take(self, limit: usize) -> TileStream<'a> {
		TileStream {
			stream: self.stream.take(limit).boxed(),
		}
	}

	pub async fn collect(self) -> Vec<Tile> {
		self.stream.collect().await
	}

	/// Drains the stream, returning the number of tiles it yielded.
	pub async fn count(self) -> u64 {
		self.stream.fold(0u64, |n, _| futures::future::ready(n + 1)).await
	}

	pub async fn for_each<F>(self, mut f: F)
	where
		F: FnMut(Tile) + Send,
	{
		self
			.stream
			.for_each(|tile| {
				f(tile);
				futures::future::ready(())
			})
			.await;
	}
}

impl<'a> From<BoxStream<'a, Tile>> for TileStream<'a> {
	fn from(stream: BoxStream<'a, Tile>) -> TileStream<'a> {
		TileStream { stream }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn coords(n: u32) -> Vec<TileCoord> {
		(0..n).map(|x| TileCoord::new(5, x, 0).unwrap()).collect()
	}

	#[tokio::test]
	async fn empty_stream() {
		let mut stream = TileStream::new_empty();
		assert!(stream.next().await.is_none());
	}

	#[tokio::test]
	async fn from_coords_yields_bare_tiles() {
		let tiles = TileStream::from_coords(coords(3)).collect().await;
		assert_eq!(tiles.len(), 3);
		assert!(tiles.iter().all(|tile| tile.data.is_none()));
		assert_eq!(tiles[2].coord, TileCoord::new(5, 2, 0).unwrap());
	}

	#[tokio::test]
	async fn map_and_filter() {
		let count = TileStream::from_coords(coords(10))
			.map(|tile| tile.with_data(&b"x"[..]))
			.filter_map(|tile| (tile.coord.x % 2 == 0).then_some(tile))
			.count()
			.await;
		assert_eq!(count, 5);
	}

	#[tokio::test]
	async fn take_truncates() {
		let tiles = TileStream::from_coords(coords(10)).take(4).collect().await;
		assert_eq!(tiles.len(), 4);
	}
}
