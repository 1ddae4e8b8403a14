//! Tiles as blobs in an Azure Storage container.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use azure_storage::StorageCredentials;
use azure_storage_blobs::prelude::{ClientBuilder, ContainerClient};
use enumset::EnumSet;
use futures::{StreamExt, future::ready, stream};
use tilecloud_core::{StoreCapability, Tile, TileStore, TileStream, layout::TileLayout};

/// Stores tiles as block blobs under names produced by the layout.
pub struct AzureTileStore {
	container: ContainerClient,
	layout: Box<dyn TileLayout>,
	cache_control: Option<String>,
}

impl AzureTileStore {
	/// Connects with the account and key from `AZURE_STORAGE_ACCOUNT` and
	/// `AZURE_STORAGE_ACCESS_KEY`, creating the container if needed.
	pub async fn new(container: impl Into<String>, layout: Box<dyn TileLayout>) -> Result<AzureTileStore> {
		let account = std::env::var("AZURE_STORAGE_ACCOUNT").context("AZURE_STORAGE_ACCOUNT is not set")?;
		let access_key =
			std::env::var("AZURE_STORAGE_ACCESS_KEY").context("AZURE_STORAGE_ACCESS_KEY is not set")?;
		let credentials = StorageCredentials::access_key(account.clone(), access_key);
		let container = ClientBuilder::new(account, credentials).container_client(container);
		Self::with_container(container, layout).await
	}

	/// Uses a caller-configured container client (emulator, SAS token).
	pub async fn with_container(container: ContainerClient, layout: Box<dyn TileLayout>) -> Result<AzureTileStore> {
		if let Err(error) = container.create().await {
			// Another writer may have created it first.
			if !is_conflict(&error) {
				return Err(anyhow::Error::new(error).context("creating container"));
			}
		}
		Ok(AzureTileStore {
			container,
			layout,
			cache_control: None,
		})
	}

	/// Sets the `Cache-Control` header written with every blob.
	#[must_use]
	pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> AzureTileStore {
		self.cache_control = Some(cache_control.into());
		self
	}

	fn blob_name(&self, tile: &Tile) -> String {
		self.layout.filename(&tile.coord)
	}
}

fn is_not_found(error: &azure_core::Error) -> bool {
	error
		.as_http_error()
		.is_some_and(|http| http.status() == azure_core::StatusCode::NotFound)
}

fn is_conflict(error: &azure_core::Error) -> bool {
	error
		.as_http_error()
		.is_some_and(|http| http.status() == azure_core::StatusCode::Conflict)
}

#[async_trait]
impl TileStore for AzureTileStore {
	fn name(&self) -> &str {
		"azure"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		let blob = self.container.blob_client(self.blob_name(tile));
		match blob.get_properties().await {
			Ok(_) => Ok(true),
			Err(error) if is_not_found(&error) => Ok(false),
			Err(error) => Err(anyhow::Error::new(error).context("checking blob")),
		}
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let name = self.blob_name(&tile);
		let blob = self.container.blob_client(&name);
		match blob.get_content().await {
			Ok(data) => {
				tile.data = Some(data.into());
				Ok(Some(tile))
			}
			Err(error) if is_not_found(&error) => Ok(None),
			Err(error) => Ok(Some(tile.with_error(
				anyhow::Error::new(error).context(format!("fetching blob '{name}'")),
			))),
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let name = self.blob_name(&tile);
		let Some(data) = tile.data.as_ref() else {
			let err = anyhow!("tile {} has no data to store", tile.coord);
			return Ok(tile.with_error(err));
		};
		let mut request = self.container.blob_client(&name).put_block_blob(data.as_slice().to_vec());
		if let Some(content_type) = tile.content_type.as_deref() {
			request = request.content_type(content_type.to_string());
		}
		if let Some(content_encoding) = tile.content_encoding.as_deref() {
			request = request.content_encoding(content_encoding.to_string());
		}
		if let Some(cache_control) = self.cache_control.as_deref() {
			request = request.cache_control(cache_control.to_string());
		}
		match request.await {
			Ok(_) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("storing blob '{name}'")),
			)),
		}
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let name = self.blob_name(&tile);
		match self.container.blob_client(&name).delete().await {
			Ok(_) => Ok(tile),
			// Deleting a missing tile is a no-op.
			Err(error) if is_not_found(&error) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("deleting blob '{name}'")),
			)),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let pages = self.container.list_blobs().into_stream();
		let names = pages
			.filter_map(|page| {
				ready(match page {
					Ok(page) => {
						let names: Vec<String> =
							page.blobs.blobs().map(|blob| blob.name.clone()).collect();
						Some(names)
					}
					Err(error) => {
						log::warn!("listing container failed: {error}");
						None
					}
				})
			})
			.flat_map(stream::iter);
		Ok(TileStream::from_inner(names.filter_map(move |name| {
			ready(self.layout.tilecoord(&name).ok().map(Tile::new))
		})))
	}
}
