//! Restricting a stream to a bounding pyramid.

use crate::{pipeline::TileFilter, types::BoundingPyramid, types::Tile};
use anyhow::Result;
use async_trait::async_trait;

/// Drops every tile whose coordinate lies outside the pyramid.
pub struct InBoundingPyramid {
	pyramid: BoundingPyramid,
}

impl InBoundingPyramid {
	#[must_use]
	pub fn new(pyramid: BoundingPyramid) -> InBoundingPyramid {
		InBoundingPyramid { pyramid }
	}
}

#[async_trait]
impl TileFilter for InBoundingPyramid {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		Ok(self.pyramid.contains(&tile.coord).then_some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	#[tokio::test]
	async fn keeps_inside_drops_outside() {
		let filter = InBoundingPyramid::new("0/0/0:2/*/*".parse().unwrap());

		let inside = Tile::new(TileCoord::new(2, 3, 1).unwrap());
		assert!(filter.filter_tile(inside).await.unwrap().is_some());

		let outside = Tile::new(TileCoord::new(3, 0, 0).unwrap());
		assert!(filter.filter_tile(outside).await.unwrap().is_none());
	}
}
