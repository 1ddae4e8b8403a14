//! World-coordinate rectangles produced by grid/extent projections.

/// An axis-aligned rectangle in world (projected) coordinates.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Extent {
	pub minx: f64,
	pub miny: f64,
	pub maxx: f64,
	pub maxy: f64,
}

impl Extent {
	#[must_use]
	pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Extent {
		Extent { minx, miny, maxx, maxy }
	}

	#[must_use]
	pub fn width(&self) -> f64 {
		self.maxx - self.minx
	}

	#[must_use]
	pub fn height(&self) -> f64 {
		self.maxy - self.miny
	}

	/// Formats as `minx,miny,maxx,maxy`, the WMS `BBOX` convention.
	#[must_use]
	pub fn to_bbox_string(&self) -> String {
		format!("{},{},{},{}", self.minx, self.miny, self.maxx, self.maxy)
	}

	#[must_use]
	pub fn as_array(&self) -> [f64; 4] {
		[self.minx, self.miny, self.maxx, self.maxy]
	}
}

impl From<[f64; 4]> for Extent {
	fn from(a: [f64; 4]) -> Self {
		Extent::new(a[0], a[1], a[2], a[3])
	}
}
