//! The default URI-to-store wiring.

use anyhow::Result;
use std::{path::Path, sync::Arc};
use tilecloud_core::{
	BoundingPyramid, ParseError, StoreRegistry, TileStore,
	layout::TemplateTileLayout,
	store::{BoundingPyramidTileStore, NullTileStore},
};
use tilecloud_queue::{RedisQueueOptions, RedisTileStore, SqsTileStore};
use tilecloud_store::{
	FilesystemTileStore, HttpTileStore, MBTilesTileStore, MemcachedTileStore, S3TileStore, ZipTileStore,
};

/// A registry wired with every store this workspace ships:
///
/// - `null://`
/// - `bounds://<pyramid dsl>` (e.g. `bounds://0/0/0:10/*/*`)
/// - `file://<template>`, `http(s)://<template>`
/// - `memcached://<host:port>/<template>`, `s3://<bucket>/<template>`
/// - `redis://<connection>?name=<queue>`, `sqs://<region>/<queue>`
/// - plain paths ending in `.mbtiles` or `.zip`
///
/// Templates use `%(z)d`, `%(x)d` and `%(y)d` placeholders.
#[must_use]
pub fn default_registry() -> StoreRegistry {
	let mut registry = StoreRegistry::new();
	registry.register_scheme("null", |_uri| async { Ok(store(NullTileStore)) });
	registry.register_scheme("bounds", bounds_store);
	registry.register_scheme("file", file_store);
	registry.register_scheme("http", http_store);
	registry.register_scheme("https", http_store);
	registry.register_scheme("memcached", memcached_store);
	registry.register_scheme("s3", s3_store);
	registry.register_scheme("redis", redis_store);
	registry.register_scheme("sqs", sqs_store);
	registry.register_extension("mbtiles", mbtiles_store);
	registry.register_extension("zip", zip_store);
	registry
}

/// Builds the store a URI names, using [`default_registry`].
pub async fn load(uri: &str) -> Result<Arc<dyn TileStore>> {
	default_registry().load(uri).await
}

fn store(store: impl TileStore + 'static) -> Arc<dyn TileStore> {
	Arc::new(store)
}

fn rest<'a>(uri: &'a str, scheme: &str) -> Result<&'a str> {
	uri
		.strip_prefix(scheme)
		.and_then(|rest| rest.strip_prefix("://"))
		.ok_or_else(|| ParseError::new(format!("expected a {scheme}:// uri, got '{uri}'")).into())
}

async fn bounds_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let pyramid: BoundingPyramid = rest(&uri, "bounds")?.parse()?;
	Ok(store(BoundingPyramidTileStore::from_pyramid(pyramid)))
}

async fn file_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let layout = TemplateTileLayout::new(rest(&uri, "file")?)?;
	Ok(store(FilesystemTileStore::new(".", Box::new(layout))))
}

async fn http_store(uri: String) -> Result<Arc<dyn TileStore>> {
	// The whole URI is the template.
	let layout = TemplateTileLayout::new(uri)?;
	Ok(store(HttpTileStore::new(Box::new(layout))))
}

async fn memcached_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let (address, template) = rest(&uri, "memcached")?
		.split_once('/')
		.ok_or_else(|| ParseError::new("expected memcached://<host:port>/<template>"))?;
	let layout = TemplateTileLayout::new(template)?;
	Ok(store(MemcachedTileStore::connect(
		&format!("memcache://{address}"),
		Box::new(layout),
	)?))
}

async fn s3_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let (bucket, template) = rest(&uri, "s3")?
		.split_once('/')
		.ok_or_else(|| ParseError::new("expected s3://<bucket>/<template>"))?;
	let layout = TemplateTileLayout::new(template)?;
	Ok(store(S3TileStore::new(bucket, Box::new(layout)).await))
}

async fn redis_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let (connection, query) = uri.split_once('?').unwrap_or((uri.as_str(), ""));
	let mut options = RedisQueueOptions::default();
	for pair in query.split('&').filter(|pair| !pair.is_empty()) {
		match pair.split_once('=') {
			Some(("name", name)) => options.name = name.to_string(),
			Some(("stop_if_empty", value)) => options.stop_if_empty = value == "1" || value == "true",
			_ => return Err(ParseError::new(format!("unknown redis queue option '{pair}'")).into()),
		}
	}
	Ok(store(RedisTileStore::connect(connection, options).await?))
}

async fn sqs_store(uri: String) -> Result<Arc<dyn TileStore>> {
	let (region, queue_name) = rest(&uri, "sqs")?
		.split_once('/')
		.ok_or_else(|| ParseError::new("expected sqs://<region>/<queue>"))?;
	let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
		.region(aws_sdk_sqs::config::Region::new(region.to_string()))
		.load()
		.await;
	let client = aws_sdk_sqs::Client::new(&config);
	let queue_url = client
		.get_queue_url()
		.queue_name(queue_name)
		.send()
		.await
		.map_err(|error| anyhow::anyhow!(error.into_service_error()))?
		.queue_url()
		.ok_or_else(|| ParseError::new(format!("queue '{queue_name}' has no url")))?
		.to_string();
	Ok(store(SqsTileStore::with_client(client, queue_url)))
}

async fn mbtiles_store(uri: String) -> Result<Arc<dyn TileStore>> {
	Ok(store(MBTilesTileStore::open(Path::new(&uri), false)?))
}

async fn zip_store(uri: String) -> Result<Arc<dyn TileStore>> {
	Ok(store(ZipTileStore::open(Path::new(&uri))?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilecloud_core::{StoreCapability, Tile, TileCoord};

	#[tokio::test]
	async fn null_and_bounds_uris() {
		let null = load("null://").await.unwrap();
		assert_eq!(null.name(), "null");

		let bounds = load("bounds://0/0/0:2/*/*").await.unwrap();
		assert_eq!(bounds.list().unwrap().count().await, 21);
	}

	#[tokio::test]
	async fn file_uri_round_trip() {
		let dir = tempfile::TempDir::new().unwrap();
		let template = format!("{}/%(z)d/%(x)d/%(y)d.png", dir.path().display());
		let files = load(&format!("file://{template}")).await.unwrap();

		files
			.put_one(Tile::new(TileCoord::new(2, 1, 3).unwrap()).with_data(&b"data"[..]))
			.await
			.unwrap();
		assert!(dir.path().join("2/1/3.png").is_file());
	}

	#[tokio::test]
	async fn mbtiles_extension() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("tiles.mbtiles");
		let mbtiles = load(path.to_str().unwrap()).await.unwrap();
		assert!(mbtiles.capabilities().contains(StoreCapability::Put));
	}

	#[tokio::test]
	async fn broken_uris_fail_to_parse() {
		assert!(load("bounds://nonsense").await.is_err());
		assert!(load("memcached://nohost").await.is_err());
		assert!(load("unknown://x").await.is_err());
	}
}
