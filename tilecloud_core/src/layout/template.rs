//! Printf-style template layouts.

use super::TileLayout;
use crate::{error::ParseError, types::TileCoord};
use anyhow::{Result, ensure};
use regex::Regex;

/// A layout driven by a template with `%(z)d`, `%(x)d` and `%(y)d`
/// placeholders, e.g. `"cache/%(z)d/%(x)d-%(y)d.png"`.
///
/// The reverse direction matches the escaped template with the placeholders
/// turned into capture groups, so the round trip is exact for any template
/// using each placeholder once.
pub struct TemplateTileLayout {
	template: String,
	pattern: Regex,
}

impl TemplateTileLayout {
	/// # Errors
	/// Fails unless the template contains each placeholder exactly once.
	pub fn new(template: impl Into<String>) -> Result<TemplateTileLayout> {
		let template = template.into();
		for placeholder in ["%(z)d", "%(x)d", "%(y)d"] {
			ensure!(
				template.matches(placeholder).count() == 1,
				"template '{template}' must contain '{placeholder}' exactly once"
			);
		}
		let pattern = format!(
			"^{}$",
			regex::escape(&template)
				.replace(r"%\(z\)d", r"(?P<z>\d+)")
				.replace(r"%\(x\)d", r"(?P<x>\d+)")
				.replace(r"%\(y\)d", r"(?P<y>\d+)")
		);
		Ok(TemplateTileLayout {
			template,
			pattern: Regex::new(&pattern)?,
		})
	}

	#[must_use]
	pub fn template(&self) -> &str {
		&self.template
	}
}

impl TileLayout for TemplateTileLayout {
	fn filename(&self, coord: &TileCoord) -> String {
		self
			.template
			.replace("%(z)d", &coord.z.to_string())
			.replace("%(x)d", &coord.x.to_string())
			.replace("%(y)d", &coord.y.to_string())
	}

	fn tilecoord(&self, filename: &str) -> Result<TileCoord> {
		let captures = self.pattern.captures(filename).ok_or_else(|| {
			ParseError::new(format!("'{filename}' does not match '{}'", self.template))
		})?;
		let int = |name: &str| -> Result<u32> {
			let digits = captures.name(name).unwrap().as_str();
			digits
				.parse()
				.map_err(|_| ParseError::new(format!("number '{digits}' out of range in '{filename}'")).into())
		};
		let z = int("z")?;
		let z = u8::try_from(z).map_err(|_| ParseError::new(format!("z ({z}) out of range")))?;
		TileCoord::new(z, int("x")?, int("y")?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn rejects_incomplete_templates() {
		assert!(TemplateTileLayout::new("%(z)d/%(x)d").is_err());
		assert!(TemplateTileLayout::new("%(z)d/%(x)d/%(y)d/%(y)d").is_err());
	}

	#[rstest]
	#[case("%(z)d/%(x)d/%(y)d")]
	#[case("cache/%(z)d/%(x)d-%(y)d.png")]
	#[case("a+b/%(y)d.%(x)d.%(z)d")]
	fn round_trip(#[case] template: &str) {
		let layout = TemplateTileLayout::new(template).unwrap();
		let coord = TileCoord::new(9, 137, 422).unwrap();
		assert_eq!(layout.tilecoord(&layout.filename(&coord)).unwrap(), coord);
	}

	#[test]
	fn escaped_literals_must_match() {
		let layout = TemplateTileLayout::new("cache/%(z)d/%(x)d-%(y)d.png").unwrap();
		assert_eq!(layout.filename(&TileCoord::new(3, 1, 2).unwrap()), "cache/3/1-2.png");
		assert!(layout.tilecoord("cache/3/1_2.png").is_err());
		assert!(layout.tilecoord("cache/3/1-2.png.bak").is_err());
	}
}
