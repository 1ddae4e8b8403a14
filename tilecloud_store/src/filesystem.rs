//! Tiles as plain files under a root directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use enumset::EnumSet;
use std::{
	fs, io,
	path::{Path, PathBuf},
};
use tilecloud_core::{StoreCapability, Tile, TileStore, TileStream, layout::TileLayout};

/// Stores each tile as one file, its path given by the layout relative to
/// `root`.
///
/// `list` walks the whole tree and silently skips paths the layout cannot
/// parse, so foreign files (e.g. a `metadata.json`) may live alongside the
/// tiles.
pub struct FilesystemTileStore {
	root: PathBuf,
	layout: Box<dyn TileLayout>,
}

impl FilesystemTileStore {
	#[must_use]
	pub fn new(root: impl Into<PathBuf>, layout: Box<dyn TileLayout>) -> FilesystemTileStore {
		FilesystemTileStore {
			root: root.into(),
			layout,
		}
	}

	fn path(&self, tile: &Tile) -> PathBuf {
		self.root.join(self.layout.filename(&tile.coord))
	}

	fn walk(dir: &Path, relative: &str, found: &mut Vec<String>) -> Result<()> {
		for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
			let entry = entry?;
			let name = entry.file_name().to_string_lossy().into_owned();
			let child = if relative.is_empty() {
				name
			} else {
				format!("{relative}/{name}")
			};
			if entry.file_type()?.is_dir() {
				Self::walk(&entry.path(), &child, found)?;
			} else {
				found.push(child);
			}
		}
		Ok(())
	}
}

fn extension_to_content_type(extension: &str) -> Option<&'static str> {
	match extension {
		"png" => Some("image/png"),
		"jpg" | "jpeg" => Some("image/jpeg"),
		"webp" => Some("image/webp"),
		"pbf" => Some("application/x-protobuf"),
		"json" => Some("application/json"),
		_ => None,
	}
}

#[async_trait]
impl TileStore for FilesystemTileStore {
	fn name(&self) -> &str {
		"filesystem"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		Ok(self.path(tile).is_file())
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let path = self.path(&tile);
		match fs::read(&path) {
			Ok(data) => {
				tile.data = Some(data.into());
				if tile.content_type.is_none() {
					tile.content_type = path
						.extension()
						.and_then(|extension| extension.to_str())
						.and_then(extension_to_content_type)
						.map(str::to_string);
				}
				Ok(Some(tile))
			}
			Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(error) => Ok(Some(
				tile.with_error(anyhow::Error::new(error).context(format!("reading {}", path.display()))),
			)),
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let path = self.path(&tile);
		let write = || -> Result<()> {
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent)?;
			}
			let data = tile.data.as_ref().map_or(&[][..], |data| data.as_slice());
			fs::write(&path, data)?;
			Ok(())
		};
		match write() {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(error.context(format!("writing {}", path.display())))),
		}
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let path = self.path(&tile);
		match fs::remove_file(&path) {
			Ok(()) => Ok(tile),
			// Deleting a missing tile is a no-op.
			Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("deleting {}", path.display())),
			)),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let mut files = Vec::new();
		if self.root.is_dir() {
			Self::walk(&self.root, "", &mut files)?;
		}
		let coords: Vec<_> = files
			.iter()
			.filter_map(|file| self.layout.tilecoord(file).ok())
			.collect();
		Ok(TileStream::from_coords(coords))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use tilecloud_core::{TileCoord, layout::OsmTileLayout};

	fn store(dir: &TempDir) -> FilesystemTileStore {
		FilesystemTileStore::new(dir.path(), Box::new(OsmTileLayout::with_extension(".png")))
	}

	fn coord(z: u8, x: u32, y: u32) -> TileCoord {
		TileCoord::new(z, x, y).unwrap()
	}

	#[tokio::test]
	async fn round_trip_on_disk() {
		let dir = TempDir::new().unwrap();
		let store = store(&dir);
		let tile = Tile::new(coord(3, 1, 2)).with_data(&b"pixels"[..]);

		store.put_one(tile.clone()).await.unwrap();
		assert!(dir.path().join("3/1/2.png").is_file());
		assert!(store.contains(&tile).await.unwrap());

		let fetched = store.get_one(Tile::new(coord(3, 1, 2))).await.unwrap().unwrap();
		assert_eq!(fetched.data.unwrap().as_slice(), b"pixels");
		assert_eq!(fetched.content_type.as_deref(), Some("image/png"));

		let deleted = store.delete_one(tile).await.unwrap();
		assert!(!deleted.has_error());
		assert!(store.get_one(Tile::new(coord(3, 1, 2))).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn delete_missing_is_idempotent() {
		let dir = TempDir::new().unwrap();
		let deleted = store(&dir).delete_one(Tile::new(coord(9, 0, 0))).await.unwrap();
		assert!(!deleted.has_error());
	}

	#[tokio::test]
	async fn list_skips_foreign_files() {
		let dir = TempDir::new().unwrap();
		let store = store(&dir);
		for (x, y) in [(0, 0), (1, 0), (1, 1)] {
			store.put_one(Tile::new(coord(1, x, y)).with_data(&b"t"[..])).await.unwrap();
		}
		fs::write(dir.path().join("metadata.json"), b"{}").unwrap();

		let tiles = store.list().unwrap().collect().await;
		assert_eq!(tiles.len(), 3);
	}
}
