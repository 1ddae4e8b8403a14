//! Tiles inside a ZIP archive.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use parking_lot::Mutex;
use std::{
	fs::{File, OpenOptions},
	io::{Read, Write},
	path::Path,
};
use tilecloud_core::{StoreCapability, Tile, TileStore, TileStream, layout::{OsmTileLayout, TileLayout}};
use zip::{CompressionMethod, ZipArchive, ZipWriter, result::ZipError, write::SimpleFileOptions};

const KNOWN_EXTENSIONS: [&str; 5] = ["png", "jpeg", "jpg", "webp", "pbf"];

enum Archive {
	Read(Mutex<ZipArchive<File>>),
	Write(Mutex<ZipWriter<File>>),
}

/// Reads tiles from, or writes tiles into, a ZIP archive under the layout's
/// entry names.
///
/// An archive is opened either for reading (`get`/`list`) or for writing
/// (`put`); ZIP files do not support in-place updates, so the two roles are
/// separate stores.
pub struct ZipTileStore {
	name: String,
	archive: Archive,
	layout: Box<dyn TileLayout>,
}

impl ZipTileStore {
	/// Opens an existing archive for reading.
	///
	/// The layout defaults to `z/x/y` with the first common image extension
	/// found among the entries.
	pub fn open(path: &Path) -> Result<ZipTileStore> {
		let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
		let archive = ZipArchive::new(file)?;
		let layout = Self::detect_layout(&archive);
		Ok(ZipTileStore {
			name: path.to_string_lossy().into_owned(),
			archive: Archive::Read(Mutex::new(archive)),
			layout,
		})
	}

	/// Creates a new archive for writing (truncating any existing file).
	pub fn create(path: &Path) -> Result<ZipTileStore> {
		let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
		Ok(ZipTileStore {
			name: path.to_string_lossy().into_owned(),
			archive: Archive::Write(Mutex::new(ZipWriter::new(file))),
			layout: Box::new(OsmTileLayout::new()),
		})
	}

	/// Opens an existing archive and appends new entries to it.
	pub fn append(path: &Path) -> Result<ZipTileStore> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)
			.with_context(|| format!("opening {}", path.display()))?;
		Ok(ZipTileStore {
			name: path.to_string_lossy().into_owned(),
			archive: Archive::Write(Mutex::new(ZipWriter::new_append(file)?)),
			layout: Box::new(OsmTileLayout::new()),
		})
	}

	/// Replaces the detected/default layout.
	#[must_use]
	pub fn with_layout(mut self, layout: Box<dyn TileLayout>) -> ZipTileStore {
		self.layout = layout;
		self
	}

	/// Flushes and closes a writing store. Reading stores need no close.
	pub fn close(self) -> Result<()> {
		if let Archive::Write(writer) = self.archive {
			writer.into_inner().finish()?;
		}
		Ok(())
	}

	fn detect_layout(archive: &ZipArchive<File>) -> Box<dyn TileLayout> {
		for name in archive.file_names() {
			if let Some((_, extension)) = name.rsplit_once('.') {
				if KNOWN_EXTENSIONS.contains(&extension) {
					return Box::new(OsmTileLayout::with_extension(format!(".{extension}")));
				}
			}
		}
		Box::new(OsmTileLayout::new())
	}
}

#[async_trait]
impl TileStore for ZipTileStore {
	fn name(&self) -> &str {
		&self.name
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		match self.archive {
			Archive::Read(_) => StoreCapability::Get | StoreCapability::List,
			Archive::Write(_) => StoreCapability::Put.into(),
		}
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let Archive::Read(archive) = &self.archive else {
			return Err(tilecloud_core::UnsupportedOperation::new(&self.name, "get_one").into());
		};
		let filename = self.layout.filename(&tile.coord);
		let mut archive = archive.lock();
		let result = match archive.by_name(&filename) {
			Ok(mut entry) => {
				let mut data = Vec::with_capacity(entry.size() as usize);
				match entry.read_to_end(&mut data) {
					Ok(_) => {
						tile.data = Some(data.into());
						Ok(Some(tile))
					}
					Err(error) => Ok(Some(tile.with_error(
						anyhow::Error::new(error).context(format!("reading entry '{filename}'")),
					))),
				}
			}
			Err(ZipError::FileNotFound) => Ok(None),
			Err(error) => Ok(Some(tile.with_error(
				anyhow::Error::new(error).context(format!("reading entry '{filename}'")),
			))),
		};
		result
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let Archive::Write(writer) = &self.archive else {
			return Err(tilecloud_core::UnsupportedOperation::new(&self.name, "put_one").into());
		};
		let Some(data) = tile.data.as_ref() else {
			let err = anyhow!("tile {} has no data to store", tile.coord);
			return Ok(tile.with_error(err));
		};
		let filename = self.layout.filename(&tile.coord);
		let write = || -> Result<()> {
			let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
			let mut writer = writer.lock();
			writer.start_file(&filename, options)?;
			writer.write_all(data.as_slice())?;
			Ok(())
		};
		match write() {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(error.context(format!("writing entry '{filename}'")))),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let Archive::Read(archive) = &self.archive else {
			return Err(tilecloud_core::UnsupportedOperation::new(&self.name, "list").into());
		};
		let archive = archive.lock();
		let coords: Vec<_> = archive
			.file_names()
			.filter_map(|name| self.layout.tilecoord(name).ok())
			.collect();
		Ok(TileStream::from_coords(coords))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use tilecloud_core::TileCoord;

	fn coord(z: u8, x: u32, y: u32) -> TileCoord {
		TileCoord::new(z, x, y).unwrap()
	}

	#[tokio::test]
	async fn write_then_read_archive() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("tiles.zip");

		let writer = ZipTileStore::create(&path)
			.unwrap()
			.with_layout(Box::new(OsmTileLayout::with_extension(".png")));
		for (x, y) in [(0, 0), (1, 1)] {
			writer
				.put_one(Tile::new(coord(1, x, y)).with_data(&b"\x89PNGdata"[..]))
				.await
				.unwrap();
		}
		writer.close().unwrap();

		// The reader detects the .png entries without being told the layout.
		let reader = ZipTileStore::open(&path).unwrap();
		assert_eq!(reader.list().unwrap().count().await, 2);
		let fetched = reader.get_one(Tile::new(coord(1, 1, 1))).await.unwrap().unwrap();
		assert_eq!(fetched.data.unwrap().as_slice(), b"\x89PNGdata");
		assert!(reader.get_one(Tile::new(coord(1, 0, 1))).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn roles_are_separate() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("tiles.zip");

		let writer = ZipTileStore::create(&path).unwrap();
		assert!(writer.list().is_err());
		writer.close().unwrap();

		let reader = ZipTileStore::open(&path).unwrap();
		let err = reader.put_one(Tile::new(coord(0, 0, 0)).with_data(&b"x"[..])).await.unwrap_err();
		assert!(err.downcast_ref::<tilecloud_core::UnsupportedOperation>().is_some());
	}
}
