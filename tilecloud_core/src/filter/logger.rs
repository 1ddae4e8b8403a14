//! Progress logging.

use crate::{pipeline::TileFilter, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use log::Level;

/// Logs every passing tile's coordinate under a fixed message, for coarse
/// progress visibility in long copies.
pub struct Logger {
	level: Level,
	message: String,
}

impl Logger {
	#[must_use]
	pub fn new(level: Level, message: impl Into<String>) -> Logger {
		Logger {
			level,
			message: message.into(),
		}
	}
}

#[async_trait]
impl TileFilter for Logger {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		log::log!(self.level, "{} {}", self.message, tile.coord);
		Ok(Some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	#[tokio::test]
	async fn passes_tiles_through() {
		let logger = Logger::new(Level::Info, "uploaded");
		let tile = Tile::new(TileCoord::new(2, 1, 1).unwrap());
		let out = logger.filter_tile(tile.clone()).await.unwrap().unwrap();
		assert_eq!(out, tile);
	}
}
