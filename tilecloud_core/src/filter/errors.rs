//! Policies for tiles carrying in-band error annotations.
//!
//! Backend failures never abort a stream by themselves; they arrive as
//! annotated tiles. These filters decide what an annotation means: drop it,
//! log it, collect it, or abort the pipeline once a threshold is crossed.

use crate::{error::TooManyErrors, pipeline::TileFilter, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Silently removes annotated tiles from the stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropErrors;

#[async_trait]
impl TileFilter for DropErrors {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		Ok((!tile.has_error()).then_some(tile))
	}
}

/// Logs annotated tiles at `warn` and passes everything through.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrors;

#[async_trait]
impl TileFilter for LogErrors {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		if let Some(error) = &tile.error {
			log::warn!("tile {} failed: {error:#}", tile.coord);
		}
		Ok(Some(tile))
	}
}

/// Accumulates annotated tiles while passing everything through, so a
/// summary can be produced after the pipeline finishes.
#[derive(Default)]
pub struct CollectErrors {
	collected: Mutex<Vec<Tile>>,
}

impl CollectErrors {
	#[must_use]
	pub fn new() -> CollectErrors {
		CollectErrors::default()
	}

	/// The annotated tiles seen so far.
	#[must_use]
	pub fn collected(&self) -> Vec<Tile> {
		self.collected.lock().clone()
	}
}

#[async_trait]
impl TileFilter for CollectErrors {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		if tile.has_error() {
			self.collected.lock().push(tile.clone());
		}
		Ok(Some(tile))
	}
}

/// Aborts once `max` annotated tiles arrive back to back; any clean tile
/// resets the run.
pub struct MaximumConsecutiveErrors {
	max: usize,
	consecutive: Mutex<usize>,
}

impl MaximumConsecutiveErrors {
	#[must_use]
	pub fn new(max: usize) -> MaximumConsecutiveErrors {
		MaximumConsecutiveErrors {
			max,
			consecutive: Mutex::new(0),
		}
	}
}

#[async_trait]
impl TileFilter for MaximumConsecutiveErrors {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		let mut consecutive = self.consecutive.lock();
		if tile.has_error() {
			*consecutive += 1;
			if *consecutive >= self.max {
				return Err(TooManyErrors(format!("{} consecutive errors", *consecutive)).into());
			}
		} else {
			*consecutive = 0;
		}
		Ok(Some(tile))
	}
}

/// Aborts once `max` annotated tiles have been seen in total.
pub struct MaximumErrors {
	max: usize,
	total: Mutex<usize>,
}

impl MaximumErrors {
	#[must_use]
	pub fn new(max: usize) -> MaximumErrors {
		MaximumErrors { max, total: Mutex::new(0) }
	}
}

#[async_trait]
impl TileFilter for MaximumErrors {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		if tile.has_error() {
			let mut total = self.total.lock();
			*total += 1;
			if *total >= self.max {
				return Err(TooManyErrors(format!("{} errors", *total)).into());
			}
		}
		Ok(Some(tile))
	}
}

/// Aborts when the error fraction exceeds `max_rate`, once at least
/// `min_tiles` tiles have been seen (so a failing first tile does not abort
/// a long run by itself).
pub struct MaximumErrorRate {
	max_rate: f64,
	min_tiles: usize,
	counts: Mutex<(usize, usize)>,
}

impl MaximumErrorRate {
	const DEFAULT_MIN_TILES: usize = 8;

	#[must_use]
	pub fn new(max_rate: f64) -> MaximumErrorRate {
		Self::with_min_tiles(max_rate, Self::DEFAULT_MIN_TILES)
	}

	#[must_use]
	pub fn with_min_tiles(max_rate: f64, min_tiles: usize) -> MaximumErrorRate {
		MaximumErrorRate {
			max_rate,
			min_tiles,
			counts: Mutex::new((0, 0)),
		}
	}
}

#[async_trait]
impl TileFilter for MaximumErrorRate {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		let mut counts = self.counts.lock();
		counts.0 += 1;
		if tile.has_error() {
			counts.1 += 1;
		}
		let (total, errors) = *counts;
		if total >= self.min_tiles && errors as f64 / total as f64 > self.max_rate {
			return Err(TooManyErrors(format!("{errors} errors in {total} tiles")).into());
		}
		Ok(Some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;
	use anyhow::anyhow;

	fn clean(x: u32) -> Tile {
		Tile::new(TileCoord::new(5, x, 0).unwrap())
	}

	fn failed(x: u32) -> Tile {
		clean(x).with_error(anyhow!("backend unavailable"))
	}

	fn is_too_many(result: Result<Option<Tile>>) -> bool {
		result
			.err()
			.is_some_and(|error| error.downcast_ref::<TooManyErrors>().is_some())
	}

	#[tokio::test]
	async fn drop_errors_filters_annotated() {
		assert!(DropErrors.filter_tile(failed(0)).await.unwrap().is_none());
		assert!(DropErrors.filter_tile(clean(0)).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn collect_errors_keeps_annotated_copies() {
		let collect = CollectErrors::new();
		collect.filter_tile(clean(0)).await.unwrap();
		collect.filter_tile(failed(1)).await.unwrap();
		collect.filter_tile(failed(2)).await.unwrap();
		let collected = collect.collected();
		assert_eq!(collected.len(), 2);
		assert!(collected.iter().all(Tile::has_error));
	}

	#[tokio::test]
	async fn consecutive_errors_reset_on_success() {
		let limit = MaximumConsecutiveErrors::new(3);
		limit.filter_tile(failed(0)).await.unwrap();
		limit.filter_tile(failed(1)).await.unwrap();
		limit.filter_tile(clean(2)).await.unwrap();
		limit.filter_tile(failed(3)).await.unwrap();
		limit.filter_tile(failed(4)).await.unwrap();
		assert!(is_too_many(limit.filter_tile(failed(5)).await));
	}

	#[tokio::test]
	async fn total_errors_abort() {
		let limit = MaximumErrors::new(2);
		limit.filter_tile(failed(0)).await.unwrap();
		limit.filter_tile(clean(1)).await.unwrap();
		assert!(is_too_many(limit.filter_tile(failed(2)).await));
	}

	#[tokio::test]
	async fn error_rate_waits_for_min_tiles() {
		let limit = MaximumErrorRate::with_min_tiles(0.25, 4);
		// A failing first tile alone must not abort.
		limit.filter_tile(failed(0)).await.unwrap();
		limit.filter_tile(clean(1)).await.unwrap();
		limit.filter_tile(clean(2)).await.unwrap();
		// 2 errors in 4 tiles = 0.5 > 0.25.
		assert!(is_too_many(limit.filter_tile(failed(3)).await));
	}
}
