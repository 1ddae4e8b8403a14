//! The tile value that flows through pipelines.

use super::{Blob, TileCoord};
use std::{collections::HashMap, fmt::Debug, sync::Arc};

/// Backend-specific delivery handle attached to a tile by the store that
/// produced it and consumed only by the matching `delete_one`.
///
/// This replaces ad-hoc per-backend attributes: a queue consumer must hand
/// the exact handle back to acknowledge the message it was delivered with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendHandle {
	/// Redis stream entry id, the ack handle for `XACK`/`XDEL`.
	Redis { id: String },
	/// SQS receipt handle of the delivered message.
	Sqs { receipt_handle: String },
	/// Flags the memcached entry was stored with.
	Memcached { flags: u32 },
}

/// A tile coordinate with an optional payload and in-band error annotation.
///
/// Tiles are owned by the stream they flow through; filters receive a tile,
/// may mutate or replace it, and return the successor. A tile whose `error`
/// is set carries no guarantee on `data`; it stays in the stream so that the
/// error-policy filters downstream decide whether to drop, log, count or
/// abort.
#[derive(Clone, Debug)]
pub struct Tile {
	/// The coordinate of this tile.
	pub coord: TileCoord,
	/// The payload, if any has been attached yet.
	pub data: Option<Blob>,
	/// MIME type of `data`, e.g. `image/png`.
	pub content_type: Option<String>,
	/// Transport encoding of `data`, e.g. `gzip`.
	pub content_encoding: Option<String>,
	/// Free-form per-tile metadata, carried through queue messages.
	pub metadata: HashMap<String, String>,
	/// In-band error annotation; set instead of raising on per-tile backend
	/// failures.
	pub error: Option<Arc<anyhow::Error>>,
	/// Delivery handle of the backend that produced this tile.
	pub handle: Option<BackendHandle>,
}

impl Tile {
	/// A bare tile carrying only its coordinate.
	#[must_use]
	pub fn new(coord: TileCoord) -> Tile {
		Tile {
			coord,
			data: None,
			content_type: None,
			content_encoding: None,
			metadata: HashMap::new(),
			error: None,
			handle: None,
		}
	}

	/// Builder-style payload attachment.
	#[must_use]
	pub fn with_data(mut self, data: impl Into<Blob>) -> Tile {
		self.data = Some(data.into());
		self
	}

	/// Builder-style content type.
	#[must_use]
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Tile {
		self.content_type = Some(content_type.into());
		self
	}

	/// Annotates this tile with an error, consuming and returning it so the
	/// annotation composes inside stream combinators.
	#[must_use]
	pub fn with_error(mut self, error: anyhow::Error) -> Tile {
		self.error = Some(Arc::new(error));
		self
	}

	#[must_use]
	pub fn has_error(&self) -> bool {
		self.error.is_some()
	}

	/// Payload size in bytes, 0 when no data is attached.
	#[must_use]
	pub fn data_len(&self) -> usize {
		self.data.as_ref().map_or(0, Blob::len)
	}
}

impl PartialEq for Tile {
	/// Tiles compare by coordinate and payload; error annotations and
	/// backend handles are transient and ignored.
	fn eq(&self, other: &Self) -> bool {
		self.coord == other.coord
			&& self.data == other.data
			&& self.content_type == other.content_type
			&& self.content_encoding == other.content_encoding
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::anyhow;

	#[test]
	fn builders() {
		let coord = TileCoord::new(3, 1, 2).unwrap();
		let tile = Tile::new(coord).with_data(&b"xyz"[..]).with_content_type("image/png");
		assert_eq!(tile.coord, coord);
		assert_eq!(tile.data_len(), 3);
		assert_eq!(tile.content_type.as_deref(), Some("image/png"));
		assert!(!tile.has_error());
	}

	#[test]
	fn error_annotation_ignored_by_eq() {
		let coord = TileCoord::new(3, 1, 2).unwrap();
		let clean = Tile::new(coord);
		let failed = Tile::new(coord).with_error(anyhow!("backend down"));
		assert!(failed.has_error());
		assert_eq!(clean, failed);
	}
}
