//! Dropping known-uninteresting payloads by size and hash.

use crate::{pipeline::TileFilter, store::TileStore, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use std::{
	hash::{DefaultHasher, Hash, Hasher},
	sync::Arc,
};

/// The hash used to fingerprint payloads for [`HashDropper`].
#[must_use]
pub fn hash_data(data: &[u8]) -> u64 {
	let mut hasher = DefaultHasher::new();
	data.hash(&mut hasher);
	hasher.finish()
}

/// Drops tiles whose payload matches a known `(size, hash)` fingerprint,
/// typically the fully transparent or sea-blue "empty" tile a renderer
/// produces for featureless areas.
///
/// When a store is attached, each dropped tile is also deleted from it, so
/// re-renders reclaim space occupied by previously stored empty tiles.
pub struct HashDropper {
	len: usize,
	hash: u64,
	store: Option<Arc<dyn TileStore>>,
}

impl HashDropper {
	#[must_use]
	pub fn new(len: usize, hash: u64) -> HashDropper {
		HashDropper { len, hash, store: None }
	}

	/// Fingerprints a sample payload, e.g. a known empty tile.
	#[must_use]
	pub fn from_sample(sample: &[u8]) -> HashDropper {
		Self::new(sample.len(), hash_data(sample))
	}

	/// Also deletes dropped tiles from `store`.
	#[must_use]
	pub fn with_store(mut self, store: Arc<dyn TileStore>) -> HashDropper {
		self.store = Some(store);
		self
	}

	fn matches(&self, tile: &Tile) -> bool {
		tile
			.data
			.as_ref()
			.is_some_and(|data| data.len() == self.len && hash_data(data.as_slice()) == self.hash)
	}
}

#[async_trait]
impl TileFilter for HashDropper {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		if !self.matches(&tile) {
			return Ok(Some(tile));
		}
		if let Some(store) = &self.store {
			let coord = tile.coord;
			if let Err(error) = store.delete_one(tile).await {
				log::warn!("could not delete dropped tile {coord}: {error:#}");
			}
		}
		Ok(None)
	}
}
