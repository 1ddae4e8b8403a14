//! Tiles as objects in an S3 bucket.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream, types::ObjectCannedAcl};
use enumset::EnumSet;
use futures::{StreamExt, future::ready, stream};
use tilecloud_core::{StoreCapability, Tile, TileStore, TileStream, layout::TileLayout};

/// Stores tiles as S3 objects under keys produced by the layout.
///
/// Objects are written `public-read` with the tile's content type, content
/// encoding and the store's cache-control header, so a bucket website or
/// CDN can serve them directly.
pub struct S3TileStore {
	client: Client,
	bucket: String,
	layout: Box<dyn TileLayout>,
	cache_control: Option<String>,
}

impl S3TileStore {
	/// Connects with the ambient AWS configuration (environment, profile,
	/// instance role).
	pub async fn new(bucket: impl Into<String>, layout: Box<dyn TileLayout>) -> S3TileStore {
		let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
		Self::with_client(Client::new(&config), bucket, layout)
	}

	#[must_use]
	pub fn with_client(client: Client, bucket: impl Into<String>, layout: Box<dyn TileLayout>) -> S3TileStore {
		S3TileStore {
			client,
			bucket: bucket.into(),
			layout,
			cache_control: None,
		}
	}

	/// Sets the `Cache-Control` header written with every object.
	#[must_use]
	pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> S3TileStore {
		self.cache_control = Some(cache_control.into());
		self
	}

	fn key(&self, tile: &Tile) -> String {
		self.layout.filename(&tile.coord)
	}
}

#[async_trait]
impl TileStore for S3TileStore {
	fn name(&self) -> &str {
		"s3"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		let head = self
			.client
			.head_object()
			.bucket(&self.bucket)
			.key(self.key(tile))
			.send()
			.await;
		match head {
			Ok(_) => Ok(true),
			Err(error) => {
				let service = error.into_service_error();
				if service.is_not_found() {
					Ok(false)
				} else {
					Err(anyhow!(service).context("checking object"))
				}
			}
		}
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let key = self.key(&tile);
		let object = self
			.client
			.get_object()
			.bucket(&self.bucket)
			.key(&key)
			.send()
			.await;
		match object {
			Ok(output) => {
				if tile.content_type.is_none() {
					tile.content_type = output.content_type().map(str::to_string);
				}
				if tile.content_encoding.is_none() {
					tile.content_encoding = output.content_encoding().map(str::to_string);
				}
				match output.body.collect().await {
					Ok(body) => {
						tile.data = Some(body.into_bytes().to_vec().into());
						Ok(Some(tile))
					}
					Err(error) => Ok(Some(tile.with_error(
						anyhow::Error::new(error).context(format!("reading body of '{key}'")),
					))),
				}
			}
			Err(error) => {
				let service = error.into_service_error();
				if service.is_no_such_key() {
					Ok(None)
				} else {
					Ok(Some(tile.with_error(anyhow!(service).context(format!("fetching '{key}'")))))
				}
			}
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let key = self.key(&tile);
		let Some(data) = tile.data.as_ref() else {
			let err = anyhow!("tile {} has no data to store", tile.coord);
			return Ok(tile.with_error(err));
		};
		let result = self
			.client
			.put_object()
			.bucket(&self.bucket)
			.key(&key)
			.acl(ObjectCannedAcl::PublicRead)
			.body(ByteStream::from(data.as_slice().to_vec()))
			.set_content_type(tile.content_type.clone())
			.set_content_encoding(tile.content_encoding.clone())
			.set_cache_control(self.cache_control.clone())
			.send()
			.await;
		match result {
			Ok(_) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow!(error.into_service_error()).context(format!("storing '{key}'")),
			)),
		}
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let key = self.key(&tile);
		let result = self
			.client
			.delete_object()
			.bucket(&self.bucket)
			.key(&key)
			.send()
			.await;
		match result {
			Ok(_) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow!(error.into_service_error()).context(format!("deleting '{key}'")),
			)),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let pages = self
			.client
			.list_objects_v2()
			.bucket(&self.bucket)
			.into_paginator()
			.send();
		let keys = stream::unfold(pages, |mut pages| async move {
			match pages.next().await {
				Some(Ok(page)) => {
					let keys: Vec<String> = page
						.contents()
						.iter()
						.filter_map(|object| object.key().map(str::to_string))
						.collect();
					Some((keys, pages))
				}
				Some(Err(error)) => {
					log::warn!("listing bucket failed: {error}");
					None
				}
				None => None,
			}
		})
		.flat_map(stream::iter);
		Ok(TileStream::from_inner(keys.filter_map(move |key| {
			ready(self.layout.tilecoord(&key).ok().map(Tile::new))
		})))
	}
}
