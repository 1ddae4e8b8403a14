//! Tiles in an MBTiles (SQLite) database.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{OptionalExtension, params},
};
use std::path::Path;
use tilecloud_core::{
	BoundingPyramid, Bounds, StoreCapability, Tile, TileCoord, TileStore, TileStream,
};

/// A store over the standard MBTiles schema: a `metadata(name, value)` table
/// and a `tiles(zoom_level, tile_column, tile_row, tile_data)` table.
///
/// MBTiles counts rows from the bottom of the grid, so the default mapping is
/// `tile_row = (1 << z) - y - 1`; pass `tilecoord_in_topleft` for databases
/// written with top-origin rows.
pub struct MBTilesTileStore {
	name: String,
	pool: Pool<SqliteConnectionManager>,
	tilecoord_in_topleft: bool,
	content_type: Option<String>,
}

impl MBTilesTileStore {
	/// Opens (or creates) the database and ensures the MBTiles schema.
	pub fn open(path: &Path, tilecoord_in_topleft: bool) -> Result<MBTilesTileStore> {
		log::debug!("open mbtiles {path:?}");
		let manager = SqliteConnectionManager::file(path);
		let pool = Pool::builder()
			.max_size(4)
			.build(manager)
			.with_context(|| format!("opening MBTiles at '{}'", path.display()))?;

		{
			let conn = pool.get()?;
			conn.execute_batch(
				"CREATE TABLE IF NOT EXISTS metadata (name TEXT PRIMARY KEY, value TEXT);
				 CREATE TABLE IF NOT EXISTS tiles (
				 	zoom_level INTEGER,
				 	tile_column INTEGER,
				 	tile_row INTEGER,
				 	tile_data BLOB,
				 	PRIMARY KEY (zoom_level, tile_column, tile_row)
				 );",
			)?;
		}

		let mut store = MBTilesTileStore {
			name: path.to_string_lossy().into_owned(),
			pool,
			tilecoord_in_topleft,
			content_type: None,
		};
		store.content_type = store
			.metadata("format")?
			.as_deref()
			.and_then(format_to_content_type)
			.map(str::to_string);
		Ok(store)
	}

	fn row(&self, z: u8, y: u32) -> u32 {
		if self.tilecoord_in_topleft {
			y
		} else {
			(1u32 << z) - y - 1
		}
	}

	/// Reads one `metadata` value.
	pub fn metadata(&self, name: &str) -> Result<Option<String>> {
		let conn = self.pool.get()?;
		let value = conn
			.query_row("SELECT value FROM metadata WHERE name = ?1", params![name], |row| {
				row.get::<_, String>(0)
			})
			.optional()?;
		Ok(value)
	}

	/// Writes one `metadata` value.
	pub fn set_metadata(&self, name: &str, value: &str) -> Result<()> {
		let conn = self.pool.get()?;
		conn.execute(
			"INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)",
			params![name, value],
		)?;
		Ok(())
	}

	/// The content type derived from the `format` metadata key.
	#[must_use]
	pub fn content_type(&self) -> Option<&str> {
		self.content_type.as_deref()
	}
}

fn format_to_content_type(format: &str) -> Option<&'static str> {
	match format {
		"png" => Some("image/png"),
		"jpg" | "jpeg" => Some("image/jpeg"),
		"webp" => Some("image/webp"),
		"pbf" => Some("application/x-protobuf"),
		_ => None,
	}
}

#[async_trait]
impl TileStore for MBTilesTileStore {
	fn name(&self) -> &str {
		&self.name
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Get | StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn contains(&self, tile: &Tile) -> Result<bool> {
		let conn = self.pool.get()?;
		let coord = tile.coord;
		let found = conn
			.query_row(
				"SELECT 1 FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
				params![coord.z, coord.x, self.row(coord.z, coord.y)],
				|_| Ok(()),
			)
			.optional()?;
		Ok(found.is_some())
	}

	async fn get_one(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let coord = tile.coord;
		let fetch = || -> Result<Option<Vec<u8>>> {
			let conn = self.pool.get()?;
			Ok(conn
				.query_row(
					"SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
					params![coord.z, coord.x, self.row(coord.z, coord.y)],
					|row| row.get::<_, Vec<u8>>(0),
				)
				.optional()?)
		};
		match fetch() {
			Ok(None) => Ok(None),
			Ok(Some(data)) => {
				tile.data = Some(data.into());
				if tile.content_type.is_none() {
					tile.content_type = self.content_type.clone();
				}
				Ok(Some(tile))
			}
			Err(error) => Ok(Some(tile.with_error(error.context(format!("reading tile {coord}"))))),
		}
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let coord = tile.coord;
		let Some(data) = tile.data.as_ref() else {
			return Ok(tile.with_error(anyhow!("tile {coord} has no data to store")));
		};
		let write = || -> Result<()> {
			let conn = self.pool.get()?;
			conn.execute(
				"INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data)
				 VALUES (?1, ?2, ?3, ?4)",
				params![coord.z, coord.x, self.row(coord.z, coord.y), data.as_slice()],
			)?;
			Ok(())
		};
		match write() {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(error.context(format!("storing tile {coord}")))),
		}
	}

	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let coord = tile.coord;
		let delete = || -> Result<()> {
			let conn = self.pool.get()?;
			conn.execute(
				"DELETE FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
				params![coord.z, coord.x, self.row(coord.z, coord.y)],
			)?;
			Ok(())
		};
		match delete() {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(error.context(format!("deleting tile {coord}")))),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let conn = self.pool.get()?;
		let mut statement = conn.prepare("SELECT zoom_level, tile_column, tile_row FROM tiles")?;
		let coords = statement
			.query_map([], |row| {
				Ok((row.get::<_, u8>(0)?, row.get::<_, u32>(1)?, row.get::<_, u32>(2)?))
			})?
			.filter_map(std::result::Result::ok)
			.filter_map(|(z, x, row)| TileCoord::new(z, x, self.row(z, row)).ok())
			.collect::<Vec<_>>();
		Ok(TileStream::from_coords(coords))
	}

	async fn get_cheap_bounding_pyramid(&self) -> Result<Option<BoundingPyramid>> {
		let conn = self.pool.get()?;
		let mut statement = conn.prepare(
			"SELECT zoom_level, MIN(tile_column), MAX(tile_column), MIN(tile_row), MAX(tile_row)
			 FROM tiles GROUP BY zoom_level",
		)?;
		let levels = statement
			.query_map([], |row| {
				Ok((
					row.get::<_, u8>(0)?,
					row.get::<_, u32>(1)?,
					row.get::<_, u32>(2)?,
					row.get::<_, u32>(3)?,
					row.get::<_, u32>(4)?,
				))
			})?
			.collect::<std::result::Result<Vec<_>, _>>()?;

		let mut pyramid = BoundingPyramid::new();
		for (z, xmin, xmax, rowmin, rowmax) in levels {
			let (ymin, ymax) = if self.tilecoord_in_topleft {
				(rowmin, rowmax)
			} else {
				((1u32 << z) - rowmax - 1, (1u32 << z) - rowmin - 1)
			};
			pyramid.add_bounds(z, (Bounds::new(xmin, xmax + 1), Bounds::new(ymin, ymax + 1)));
		}
		Ok(Some(pyramid))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn coord(z: u8, x: u32, y: u32) -> TileCoord {
		TileCoord::new(z, x, y).unwrap()
	}

	fn open(dir: &TempDir) -> MBTilesTileStore {
		MBTilesTileStore::open(&dir.path().join("tiles.mbtiles"), false).unwrap()
	}

	#[tokio::test]
	async fn default_convention_flips_rows() {
		let dir = TempDir::new().unwrap();
		let store = open(&dir);
		store.put_one(Tile::new(coord(3, 1, 2)).with_data(&b"X"[..])).await.unwrap();

		// 3/1/2 lands in bottom-origin row (1<<3) - 2 - 1 = 5.
		let conn = store.pool.get().unwrap();
		let row: u32 = conn
			.query_row("SELECT tile_row FROM tiles WHERE zoom_level = 3 AND tile_column = 1", [], |row| {
				row.get(0)
			})
			.unwrap();
		assert_eq!(row, 5);

		let fetched = store.get_one(Tile::new(coord(3, 1, 2))).await.unwrap().unwrap();
		assert_eq!(fetched.coord, coord(3, 1, 2));
		assert_eq!(fetched.data.unwrap().as_slice(), b"X");
	}

	#[tokio::test]
	async fn topleft_convention_stores_rows_verbatim() {
		let dir = TempDir::new().unwrap();
		let store = MBTilesTileStore::open(&dir.path().join("tiles.mbtiles"), true).unwrap();
		store.put_one(Tile::new(coord(3, 1, 2)).with_data(&b"X"[..])).await.unwrap();

		let conn = store.pool.get().unwrap();
		let row: u32 = conn
			.query_row("SELECT tile_row FROM tiles WHERE zoom_level = 3", [], |row| row.get(0))
			.unwrap();
		assert_eq!(row, 2);
	}

	#[tokio::test]
	async fn reopen_preserves_tiles_and_metadata() {
		let dir = TempDir::new().unwrap();
		{
			let store = open(&dir);
			store.set_metadata("format", "png").unwrap();
			store.put_one(Tile::new(coord(2, 1, 1)).with_data(&b"png bytes"[..])).await.unwrap();
		}
		let store = open(&dir);
		assert_eq!(store.content_type(), Some("image/png"));
		let fetched = store.get_one(Tile::new(coord(2, 1, 1))).await.unwrap().unwrap();
		assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
	}

	#[tokio::test]
	async fn cheap_pyramid_aggregates_per_level() {
		let dir = TempDir::new().unwrap();
		let store = open(&dir);
		for (z, x, y) in [(2, 0, 1), (2, 3, 2), (4, 7, 9)] {
			store.put_one(Tile::new(coord(z, x, y)).with_data(&b"t"[..])).await.unwrap();
		}

		let pyramid = store.get_cheap_bounding_pyramid().await.unwrap().unwrap();
		assert_eq!(pyramid.bounds(2), Some(&(Bounds::new(0, 4), Bounds::new(1, 3))));
		assert_eq!(pyramid.bounds(4), Some(&(Bounds::new(7, 8), Bounds::new(9, 10))));

		assert!(store.contains(&Tile::new(coord(4, 7, 9))).await.unwrap());
		store.delete_one(Tile::new(coord(4, 7, 9))).await.unwrap();
		assert!(!store.contains(&Tile::new(coord(4, 7, 9))).await.unwrap());
		assert_eq!(store.list().unwrap().count().await, 2);
	}
}
