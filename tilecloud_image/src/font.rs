//! A tiny built-in 3x5 pixel font, enough to label tiles with `z/x/y`.

use image::{Rgba, RgbaImage};

pub const GLYPH_WIDTH: u32 = 3;
pub const GLYPH_HEIGHT: u32 = 5;

/// Glyph rows, low three bits per row, bit 2 is the left column.
fn glyph(character: char) -> Option<[u8; 5]> {
	Some(match character {
		'0' => [0b111, 0b101, 0b101, 0b101, 0b111],
		'1' => [0b010, 0b110, 0b010, 0b010, 0b111],
		'2' => [0b111, 0b001, 0b111, 0b100, 0b111],
		'3' => [0b111, 0b001, 0b111, 0b001, 0b111],
		'4' => [0b101, 0b101, 0b111, 0b001, 0b001],
		'5' => [0b111, 0b100, 0b111, 0b001, 0b111],
		'6' => [0b111, 0b100, 0b111, 0b101, 0b111],
		'7' => [0b111, 0b001, 0b010, 0b010, 0b010],
		'8' => [0b111, 0b101, 0b111, 0b101, 0b111],
		'9' => [0b111, 0b101, 0b111, 0b001, 0b111],
		'/' => [0b001, 0b001, 0b010, 0b100, 0b100],
		':' => [0b000, 0b010, 0b000, 0b010, 0b000],
		'+' => [0b000, 0b010, 0b111, 0b010, 0b000],
		_ => return None,
	})
}

/// Draws `text` at `(x, y)`, each font pixel scaled to `scale` image pixels.
/// Unknown characters advance the cursor like a space.
pub fn draw_text(image: &mut RgbaImage, x: u32, y: u32, scale: u32, text: &str, color: Rgba<u8>) {
	let mut cursor = x;
	for character in text.chars() {
		if let Some(rows) = glyph(character) {
			for (row, bits) in rows.iter().enumerate() {
				for column in 0..GLYPH_WIDTH {
					if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
						continue;
					}
					for dy in 0..scale {
						for dx in 0..scale {
							let px = cursor + column * scale + dx;
							let py = y + row as u32 * scale + dy;
							if px < image.width() && py < image.height() {
								image.put_pixel(px, py, color);
							}
						}
					}
				}
			}
		}
		cursor += (GLYPH_WIDTH + 1) * scale;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn draws_within_bounds() {
		let mut image = RgbaImage::new(64, 16);
		draw_text(&mut image, 2, 2, 2, "3/1/2", Rgba([0, 0, 0, 255]));
		assert!(image.pixels().any(|pixel| pixel.0[3] != 0));

		// Clipping at the edge must not panic.
		draw_text(&mut image, 60, 12, 4, "888", Rgba([0, 0, 0, 255]));
	}

	#[test]
	fn unknown_characters_leave_gaps() {
		let mut image = RgbaImage::new(16, 8);
		draw_text(&mut image, 0, 0, 1, "x", Rgba([0, 0, 0, 255]));
		assert!(image.pixels().all(|pixel| pixel.0[3] == 0));
	}
}
