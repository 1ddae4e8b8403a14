//! URI-based store construction.
//!
//! Backends register a constructor per URI scheme (`s3://…`) or file
//! extension (`.mbtiles`); [`StoreRegistry::load`] dispatches a URI to the
//! matching constructor. The set stays open: any crate can register its own
//! scheme without this one knowing about it.

use crate::{error::ParseError, store::TileStore};
use anyhow::Result;
use futures::future::BoxFuture;
use std::{collections::HashMap, future::Future, path::Path, sync::Arc};

type StoreFactory = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Arc<dyn TileStore>>> + Send + Sync>;

/// Maps URI schemes and file extensions to store constructors.
///
/// Each constructor receives the full URI, so a scheme owns everything after
/// `://` (bucket names, templates, query options).
#[derive(Default, Clone)]
pub struct StoreRegistry {
	schemes: HashMap<String, StoreFactory>,
	extensions: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
	#[must_use]
	pub fn new() -> StoreRegistry {
		StoreRegistry::default()
	}

	/// Registers a constructor for `scheme://…` URIs.
	pub fn register_scheme<F, Fut>(&mut self, scheme: impl Into<String>, factory: F)
	where
		F: Fn(String) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Arc<dyn TileStore>>> + Send + 'static,
	{
		self
			.schemes
			.insert(scheme.into(), Arc::new(move |uri| Box::pin(factory(uri))));
	}

	/// Registers a constructor for paths ending in `.extension`.
	pub fn register_extension<F, Fut>(&mut self, extension: impl Into<String>, factory: F)
	where
		F: Fn(String) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Arc<dyn TileStore>>> + Send + 'static,
	{
		self
			.extensions
			.insert(extension.into(), Arc::new(move |uri| Box::pin(factory(uri))));
	}

	/// Builds the store a URI names.
	///
	/// # Errors
	/// Returns a [`ParseError`] when no scheme or extension matches;
	/// constructor failures pass through.
	pub async fn load(&self, uri: &str) -> Result<Arc<dyn TileStore>> {
		let factory = if let Some((scheme, _)) = uri.split_once("://") {
			self
				.schemes
				.get(scheme)
				.ok_or_else(|| ParseError::new(format!("no store registered for scheme '{scheme}'")))?
		} else {
			let extension = Path::new(uri)
				.extension()
				.and_then(|extension| extension.to_str())
				.ok_or_else(|| ParseError::new(format!("cannot derive a store from '{uri}'")))?;
			self.extensions.get(extension).ok_or_else(|| {
				ParseError::new(format!("no store registered for extension '.{extension}'"))
			})?
		};
		factory(uri.to_string()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{MemoryTileStore, NullTileStore};

	fn registry() -> StoreRegistry {
		let mut registry = StoreRegistry::new();
		registry.register_scheme("null", |_uri| async { Ok(Arc::new(NullTileStore) as Arc<dyn TileStore>) });
		registry.register_extension("mem", |_uri| async {
			Ok(Arc::new(MemoryTileStore::new()) as Arc<dyn TileStore>)
		});
		registry
	}

	#[tokio::test]
	async fn dispatches_on_scheme() {
		let store = registry().load("null://").await.unwrap();
		assert_eq!(store.name(), "null");
	}

	#[tokio::test]
	async fn dispatches_on_extension() {
		let store = registry().load("tiles/world.mem").await.unwrap();
		assert_eq!(store.name(), "memory");
	}

	#[tokio::test]
	async fn unknown_uris_fail_with_parse_error() {
		let registry = registry();
		for uri in ["ftp://example.com/tiles", "world.sqlite", "plainname"] {
			let err = registry.load(uri).await.err().unwrap();
			assert!(err.downcast_ref::<ParseError>().is_some(), "{uri}");
		}
	}
}
