//! Shelling out to `optipng`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::fs;
use tilecloud_core::{Tile, TileFilter};
use tokio::process::Command;

/// Recompresses PNG tiles with the external `optipng` binary.
///
/// Non-PNG tiles, tiles without data and tiles already carrying an error
/// pass through untouched. The data is round-tripped through a temp file
/// which is removed on every path; failures are annotated on the tile.
pub struct OptiPng {
	level: u8,
}

impl OptiPng {
	/// `level` is optipng's `-o` optimization level (0..=7).
	#[must_use]
	pub fn new(level: u8) -> OptiPng {
		OptiPng { level: level.min(7) }
	}

	async fn optimize(&self, data: &[u8]) -> Result<Vec<u8>> {
		let file = tempfile::Builder::new()
			.suffix(".png")
			.tempfile()
			.context("creating temp file")?;
		fs::write(file.path(), data).context("writing temp file")?;

		let output = Command::new("optipng")
			.arg(format!("-o{}", self.level))
			.arg("-q")
			.arg(file.path())
			.output()
			.await
			.context("running optipng")?;
		if !output.status.success() {
			return Err(anyhow!(
				"optipng failed with {}: {}",
				output.status,
				String::from_utf8_lossy(&output.stderr).trim()
			));
		}
		fs::read(file.path()).context("reading optimized file")
	}
}

#[async_trait]
impl TileFilter for OptiPng {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		if tile.has_error() || tile.content_type.as_deref() != Some("image/png") {
			return Ok(Some(tile));
		}
		let optimized = match tile.data.as_ref() {
			None => return Ok(Some(tile)),
			Some(data) => self.optimize(data.as_slice()).await,
		};
		match optimized {
			Ok(data) => {
				tile.data = Some(data.into());
				Ok(Some(tile))
			}
			Err(error) => Ok(Some(tile.with_error(error))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilecloud_core::TileCoord;

	#[tokio::test]
	async fn non_png_passes_through() {
		let filter = OptiPng::new(2);
		let tile = Tile::new(TileCoord::new(1, 0, 0).unwrap())
			.with_data(&b"\xff\xd8jpeg"[..])
			.with_content_type("image/jpeg");
		let passed = filter.filter_tile(tile.clone()).await.unwrap().unwrap();
		assert_eq!(passed.data, tile.data);
		assert!(!passed.has_error());
	}

	#[tokio::test]
	async fn level_is_clamped() {
		assert_eq!(OptiPng::new(9).level, 7);
	}
}
