//! Tiles cached in memcached.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use tilecloud_core::{BackendHandle, StoreCapability, Tile, TileStore, layout::TileLayout};

/// Caches tile data in memcached under keys produced by the layout.
///
/// Only the raw data is stored; content type and encoding do not survive a
/// round trip. Listing is unsupported, memcached cannot enumerate keys.
pub struct MemcachedTileStore {
	client: memcache::Client,
	layout: Box<dyn TileLayout>,
	expire_seconds: u32,
}

impl MemcachedTileStore {
	/// Connects to e.g. `memcache://localhost:11211`.
	pub fn connect(url: &str, layout: Box<dyn TileLayout>) -> Result<MemcachedTileStore> {
		let client = memcache::Client::connect(url).with_context(|| format!("connecting to '{url}'"))?;
		Ok(Self::with_client(client, layout))
	}

	#[must_use]
	pub fn with_client(client: memcache::Client, layout: Box<dyn TileLayout>) -> MemcachedTileStore {
		MemcachedTileStore {
			client,
			layout,
			expire_seconds: 0,
		}
	}

	/// Sets the expiry of stored tiles (zero keeps them until evicted).
	#[must_use]
	pub fn with_expiry(mut self, expire_seconds: u32) -> MemcachedTileStore {
		self.expire_seconds = expire_seconds;
		self
	}

	fn key(&self, tile: &Tile) -> String {
		self.layout.filename(&tile.coord)
	}
}

#[async_trait]
impl TileStore for MemcachedTileStore {
	fn name(&self) -> &str {
		"memcached"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let key = self.key(&tile);
		// `gets` also returns the flags the entry was stored with.
		match self.client.gets::<(Vec<u8>, u32, Option<u64>)>(&[key.as_str()]) {
			Ok(mut found) => match found.remove(&key) {
				None => Ok(None),
				Some((data, flags, _cas)) => {
					tile.data = Some(data.into());
					tile.handle = Some(BackendHandle::Memcached { flags });
					Ok(Some(tile))
				}
			},
			Err(error) => Ok(Some(tile.with_error(
				anyhow::Error::new(error).context(format!("fetching '{key}'")),
			))),
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let key = self.key(&tile);
		let Some(data) = tile.data.as_ref() else {
			let err = anyhow!("tile {} has no data to store", tile.coord);
			return Ok(tile.with_error(err));
		};
		match self.client.set(&key, data.as_slice(), self.expire_seconds) {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("storing '{key}'")),
			)),
		}
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let key = self.key(&tile);
		match self.client.delete(&key) {
			// Deleting a missing tile is a no-op.
			Ok(_) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("deleting '{key}'")),
			)),
		}
	}
}
