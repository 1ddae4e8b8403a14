//! Tiles behind plain HTTP GET endpoints.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use tilecloud_core::{StoreCapability, Tile, TileStore, layout::TileLayout};

/// Fetches tiles over HTTP from URLs produced by the layout (an URL
/// template, or a WMS/WMTS request layout).
///
/// Read-only: `put`/`delete` stay unsupported. A 404 is a missing tile; any
/// other non-success status is annotated on the tile.
pub struct HttpTileStore {
	client: reqwest::Client,
	layout: Box<dyn TileLayout>,
}

impl HttpTileStore {
	#[must_use]
	pub fn new(layout: Box<dyn TileLayout>) -> HttpTileStore {
		Self::with_client(reqwest::Client::new(), layout)
	}

	/// Uses a caller-configured client (proxies, headers, timeouts).
	#[must_use]
	pub fn with_client(client: reqwest::Client, layout: Box<dyn TileLayout>) -> HttpTileStore {
		HttpTileStore { client, layout }
	}
}

#[async_trait]
impl TileStore for HttpTileStore {
	fn name(&self) -> &str {
		"http"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get.into()
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		let url = self.layout.filename(&tile.coord);
		let response = self.client.head(&url).send().await?;
		Ok(response.status().is_success())
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let url = self.layout.filename(&tile.coord);
		let response = match self.client.get(&url).send().await {
			Ok(response) => response,
			Err(error) => {
				return Ok(Some(tile.with_error(
					anyhow::Error::new(error).context(format!("fetching {url}")),
				)));
			}
		};

		let status = response.status();
		if status == reqwest::StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !status.is_success() {
			return Ok(Some(tile.with_error(anyhow!("unexpected status {status} for {url}"))));
		}

		if tile.content_type.is_none() {
			tile.content_type = response
				.headers()
				.get(reqwest::header::CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(str::to_string);
		}
		match response.bytes().await {
			Ok(bytes) => {
				tile.data = Some(bytes.to_vec().into());
				Ok(Some(tile))
			}
			Err(error) => Ok(Some(tile.with_error(
				anyhow::Error::new(error).context(format!("reading body of {url}")),
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilecloud_core::{TileCoord, UnsupportedOperation, layout::TemplateTileLayout};

	fn store() -> HttpTileStore {
		let layout = TemplateTileLayout::new("http://127.0.0.1:1/%(z)d/%(x)d/%(y)d.png").unwrap();
		HttpTileStore::new(Box::new(layout))
	}

	#[tokio::test]
	async fn writes_are_unsupported() {
		let store = store();
		let tile = Tile::new(TileCoord::new(1, 0, 0).unwrap());
		let err = store.put_one(tile.clone()).await.unwrap_err();
		assert!(err.downcast_ref::<UnsupportedOperation>().is_some());
		assert!(store.delete_one(tile).await.is_err());
		assert!(store.list().is_err());
	}

	#[tokio::test]
	async fn transport_failure_is_annotated() {
		// Port 1 refuses connections; the failure must land on the tile.
		let store = store();
		let tile = Tile::new(TileCoord::new(1, 0, 0).unwrap());
		let fetched = store.get_one(tile).await.unwrap().unwrap();
		assert!(fetched.has_error());
		assert!(fetched.data.is_none());
	}
}
