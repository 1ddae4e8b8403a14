//! Filtering tiles by geometry.

use anyhow::Result;
use async_trait::async_trait;
use geo::{Geometry, Intersects, Rect, coord};
use std::sync::Arc;
use tilecloud_core::{Tile, TileFilter, TileGrid};

/// Keeps only tiles whose grid extent intersects a geometry (in the grid's
/// projected coordinates).
pub struct IntersectsGeometry {
	geometry: Geometry<f64>,
	grid: Arc<dyn TileGrid>,
}

impl IntersectsGeometry {
	#[must_use]
	pub fn new(geometry: Geometry<f64>, grid: Arc<dyn TileGrid>) -> IntersectsGeometry {
		IntersectsGeometry { geometry, grid }
	}
}

#[async_trait]
impl TileFilter for IntersectsGeometry {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		let extent = self.grid.extent(&tile.coord, 0.0);
		let rect = Rect::new(
			coord! { x: extent.minx, y: extent.miny },
			coord! { x: extent.maxx, y: extent.maxy },
		);
		if rect.to_polygon().intersects(&self.geometry) {
			Ok(Some(tile))
		} else {
			Ok(None)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use geo::polygon;
	use tilecloud_core::{TileCoord, web_mercator};

	#[tokio::test]
	async fn keeps_intersecting_tiles() {
		// A small polygon around the origin of the projection.
		let polygon = polygon![
			(x: -1000.0, y: -1000.0),
			(x: 1000.0, y: -1000.0),
			(x: 1000.0, y: 1000.0),
			(x: -1000.0, y: 1000.0),
		];
		let filter = IntersectsGeometry::new(Geometry::Polygon(polygon), web_mercator());

		// At z2 the four center tiles touch the origin, the corner ones do not.
		let center = Tile::new(TileCoord::new(2, 1, 1).unwrap());
		let corner = Tile::new(TileCoord::new(2, 0, 0).unwrap());
		assert!(filter.filter_tile(center).await.unwrap().is_some());
		assert!(filter.filter_tile(corner).await.unwrap().is_none());
	}
}
