//! Deterministic sharding of a tile stream.

use crate::{pipeline::TileFilter, types::Tile};
use anyhow::{Result, ensure};
use async_trait::async_trait;

/// Keeps the tiles of shard `i` out of `n`, decided by the coordinate hash.
///
/// Running `n` workers with `i = 0..n` over the same source partitions the
/// stream without coordination.
#[derive(Clone, Copy, Debug)]
pub struct EveryNth {
	n: u64,
	i: u64,
}

impl EveryNth {
	/// # Errors
	/// Fails unless `i < n` and `n > 0`.
	pub fn new(n: u64, i: u64) -> Result<EveryNth> {
		ensure!(n > 0, "shard count must be positive");
		ensure!(i < n, "shard index {i} out of range for {n} shards");
		Ok(EveryNth { n, i })
	}
}

#[async_trait]
impl TileFilter for EveryNth {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		Ok((tile.coord.hash_value() % self.n == self.i).then_some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	#[test]
	fn rejects_bad_shards() {
		assert!(EveryNth::new(0, 0).is_err());
		assert!(EveryNth::new(4, 4).is_err());
	}

	#[tokio::test]
	async fn shards_partition_the_stream() {
		let coords: Vec<TileCoord> = (0..32)
			.flat_map(|x| (0..32).map(move |y| TileCoord::new(8, x, y).unwrap()))
			.collect();

		let mut kept_total = 0;
		for i in 0..4 {
			let shard = EveryNth::new(4, i).unwrap();
			for &coord in &coords {
				if shard.filter_tile(Tile::new(coord)).await.unwrap().is_some() {
					kept_total += 1;
				}
			}
		}
		// Each tile lands in exactly one shard.
		assert_eq!(kept_total, coords.len());
	}
}
