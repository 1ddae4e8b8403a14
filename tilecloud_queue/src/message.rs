//! The wire format of a queued tile job.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tilecloud_core::{Tile, TileCoord};

/// JSON body of a queue message, base64-wrapped on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TileMessage {
	z: u8,
	x: u32,
	y: u32,
	#[serde(default = "default_n")]
	n: u32,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	metadata: HashMap<String, String>,
}

fn default_n() -> u32 {
	1
}

/// Encodes a tile's coordinate and metadata as base64(JSON).
pub fn encode_message(tile: &Tile) -> Result<String> {
	let coord = tile.coord;
	let message = TileMessage {
		z: coord.z,
		x: coord.x,
		y: coord.y,
		n: coord.n,
		metadata: tile.metadata.clone(),
	};
	let json = serde_json::to_vec(&message).context("serializing tile message")?;
	Ok(STANDARD.encode(json))
}

/// Decodes a base64(JSON) message back into a bare tile.
pub fn decode_message(text: &str) -> Result<Tile> {
	let json = STANDARD.decode(text.trim()).context("message is not base64")?;
	let message: TileMessage = serde_json::from_slice(&json).context("message is not a tile job")?;
	let coord = if message.n <= 1 {
		TileCoord::new(message.z, message.x, message.y)?
	} else {
		TileCoord::new_metatile(message.z, message.x, message.y, message.n)?
	};
	let mut tile = Tile::new(coord);
	tile.metadata = message.metadata;
	Ok(tile)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn round_trip_keeps_coord_and_metadata() {
		let mut tile = Tile::new(TileCoord::new_metatile(4, 8, 12, 2).unwrap());
		tile.metadata.insert("layer".to_string(), "roads".to_string());

		let decoded = decode_message(&encode_message(&tile).unwrap()).unwrap();
		assert_eq!(decoded.coord, tile.coord);
		assert_eq!(decoded.coord.n, 2);
		assert_eq!(decoded.metadata.get("layer").map(String::as_str), Some("roads"));
		assert!(decoded.data.is_none());
	}

	#[test]
	fn plain_json_defaults_to_unit_tile() {
		// Messages from older publishers omit `n`.
		let encoded = STANDARD.encode(br#"{"z":3,"x":1,"y":2}"#);
		let decoded = decode_message(&encoded).unwrap();
		assert_eq!(decoded.coord, TileCoord::new(3, 1, 2).unwrap());
		assert_eq!(decoded.coord.n, 1);
	}

	#[rstest]
	#[case("not base64!!")]
	#[case("bm90IGpzb24=")] // "not json"
	#[case("eyJ6IjozfQ==")] // {"z":3} - missing x/y
	fn broken_messages_are_rejected(#[case] text: &str) {
		assert!(decode_message(text).is_err());
	}
}
