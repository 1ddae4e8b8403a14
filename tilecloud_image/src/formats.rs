//! Encoding and decoding bridges between content types and [`DynamicImage`].

use anyhow::{Result, anyhow, bail};
use image::{
	DynamicImage, ImageEncoder, ImageFormat,
	codecs::{jpeg::JpegEncoder, png::PngEncoder, webp::WebPEncoder},
	load_from_memory, load_from_memory_with_format,
};
use tilecloud_core::Blob;

/// Maps a tile content type to the image format it declares.
#[must_use]
pub fn format_for_content_type(content_type: &str) -> Option<ImageFormat> {
	match content_type {
		"image/png" => Some(ImageFormat::Png),
		"image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
		"image/webp" => Some(ImageFormat::WebP),
		_ => None,
	}
}

/// Decodes tile data, trusting `content_type` when it names a known format
/// and guessing from magic bytes otherwise.
pub fn decode(data: &Blob, content_type: Option<&str>) -> Result<DynamicImage> {
	match content_type.and_then(format_for_content_type) {
		Some(format) => load_from_memory_with_format(data.as_slice(), format)
			.map_err(|error| anyhow!("decoding {format:?} image: {error}")),
		None => load_from_memory(data.as_slice()).map_err(|error| anyhow!("decoding image: {error}")),
	}
}

/// Encodes an image for the given content type.
///
/// `quality` applies to JPEG only (0..=99, default 95); PNG and WebP are
/// written lossless.
pub fn encode(image: &DynamicImage, content_type: &str, quality: Option<u8>) -> Result<Blob> {
	let mut buffer: Vec<u8> = Vec::new();
	match format_for_content_type(content_type) {
		Some(ImageFormat::Png) => {
			PngEncoder::new(&mut buffer).write_image(
				image.as_bytes(),
				image.width(),
				image.height(),
				image.color().into(),
			)?;
		}
		Some(ImageFormat::Jpeg) => {
			let quality = quality.unwrap_or(95);
			if quality >= 100 {
				bail!("JPEG does not support lossless compression, use a quality < 100");
			}
			// JPEG carries no alpha channel.
			let image = if image.color().has_alpha() {
				DynamicImage::ImageRgb8(image.to_rgb8())
			} else {
				image.clone()
			};
			JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
				image.as_bytes(),
				image.width(),
				image.height(),
				image.color().into(),
			)?;
		}
		Some(ImageFormat::WebP) => {
			WebPEncoder::new_lossless(&mut buffer).write_image(
				image.as_bytes(),
				image.width(),
				image.height(),
				image.color().into(),
			)?;
		}
		_ => bail!("unsupported image content type '{content_type}'"),
	}
	Ok(Blob::from(buffer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("image/png")]
	#[case("image/jpeg")]
	#[case("image/webp")]
	fn encode_then_decode(#[case] content_type: &str) {
		let image = DynamicImage::ImageRgb8(image::RgbImage::from_fn(8, 8, |x, y| {
			image::Rgb([x as u8 * 32, y as u8 * 32, 128])
		}));
		let blob = encode(&image, content_type, None).unwrap();
		let decoded = decode(&blob, Some(content_type)).unwrap();
		assert_eq!(decoded.width(), 8);
		assert_eq!(decoded.height(), 8);
	}

	#[test]
	fn decode_guesses_without_content_type() {
		let image = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
		let blob = encode(&image, "image/png", None).unwrap();
		assert!(decode(&blob, None).is_ok());
	}

	#[test]
	fn unknown_content_type_is_rejected() {
		let image = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
		assert!(encode(&image, "application/x-protobuf", None).is_err());
		assert!(encode(&image, "image/jpeg", Some(100)).is_err());
	}
}
