//! Content-type detection from payload magic bytes.

use crate::{pipeline::TileFilter, types::Tile};
use anyhow::Result;
use async_trait::async_trait;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = b"\xff\xd8";

/// Fills in a missing `content_type`, either with a fixed value or by
/// sniffing the payload's magic bytes. Tiles that already carry a type pass
/// through untouched.
#[derive(Debug, Default)]
pub struct ContentTypeAdder {
	content_type: Option<String>,
}

impl ContentTypeAdder {
	/// Sniffs PNG, JPEG and JSON payloads.
	#[must_use]
	pub fn new() -> ContentTypeAdder {
		ContentTypeAdder::default()
	}

	/// Stamps every untyped tile with `content_type` instead of sniffing.
	#[must_use]
	pub fn fixed(content_type: impl Into<String>) -> ContentTypeAdder {
		ContentTypeAdder {
			content_type: Some(content_type.into()),
		}
	}

	fn sniff(data: &[u8]) -> Option<&'static str> {
		if data.starts_with(PNG_MAGIC) {
			Some("image/png")
		} else if data.starts_with(JPEG_MAGIC) {
			Some("image/jpeg")
		} else if data.starts_with(b"{") {
			Some("application/json")
		} else {
			None
		}
	}
}

#[async_trait]
impl TileFilter for ContentTypeAdder {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		if tile.content_type.is_none() {
			tile.content_type = match (&self.content_type, &tile.data) {
				(Some(fixed), _) => Some(fixed.clone()),
				(None, Some(data)) => Self::sniff(data.as_slice()).map(str::to_string),
				(None, None) => None,
			};
		}
		Ok(Some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;
	use rstest::rstest;

	fn tile(data: &[u8]) -> Tile {
		Tile::new(TileCoord::new(1, 0, 0).unwrap()).with_data(data)
	}

	#[rstest]
	#[case(&b"\x89PNG\r\n\x1a\nrest"[..], Some("image/png"))]
	#[case(&b"\xff\xd8\xff\xe0"[..], Some("image/jpeg"))]
	#[case(&b"{\"type\":\"FeatureCollection\"}"[..], Some("application/json"))]
	#[case(&b"plain"[..], None)]
	#[tokio::test]
	async fn sniffs_magic_bytes(#[case] data: &[u8], #[case] expected: Option<&str>) {
		let filtered = ContentTypeAdder::new().filter_tile(tile(data)).await.unwrap().unwrap();
		assert_eq!(filtered.content_type.as_deref(), expected);
	}

	#[tokio::test]
	async fn existing_type_wins() {
		let typed = tile(b"\x89PNG\r\n\x1a\n").with_content_type("image/webp");
		let filtered = ContentTypeAdder::new().filter_tile(typed).await.unwrap().unwrap();
		assert_eq!(filtered.content_type.as_deref(), Some("image/webp"));
	}

	#[tokio::test]
	async fn fixed_type_skips_sniffing() {
		let filtered = ContentTypeAdder::fixed("application/x-protobuf")
			.filter_tile(tile(b"\x1a\x05"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(filtered.content_type.as_deref(), Some("application/x-protobuf"));
	}
}
