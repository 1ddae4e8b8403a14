//! Half-open integer intervals with an explicit empty state.

use std::fmt::{self, Debug};

/// A half-open interval `[start, stop)` over tile indices, possibly empty.
///
/// Used in pairs (one for `x`, one for `y`) to describe the tile extent of a
/// single zoom level.
///
/// # Examples
///
/// ```
/// use tilecloud_core::Bounds;
///
/// let mut bounds = Bounds::new_empty();
/// assert!(bounds.is_empty());
///
/// bounds.add(3);
/// bounds.add(7);
/// assert_eq!(bounds.start(), Some(3));
/// assert_eq!(bounds.stop(), Some(8));
/// assert!(bounds.contains(7));
/// assert!(!bounds.contains(8));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds(Option<(u32, u32)>);

impl Bounds {
	/// The empty interval.
	#[must_use]
	pub fn new_empty() -> Bounds {
		Bounds(None)
	}

	/// The interval `[start, stop)`; empty if `start >= stop`.
	#[must_use]
	pub fn new(start: u32, stop: u32) -> Bounds {
		if start < stop { Bounds(Some((start, stop))) } else { Bounds(None) }
	}

	/// Lowest contained value, `None` when empty.
	#[must_use]
	pub fn start(&self) -> Option<u32> {
		self.0.map(|(start, _)| start)
	}

	/// One past the highest contained value, `None` when empty.
	#[must_use]
	pub fn stop(&self) -> Option<u32> {
		self.0.map(|(_, stop)| stop)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_none()
	}

	/// Number of contained values.
	#[must_use]
	pub fn len(&self) -> u32 {
		self.0.map_or(0, |(start, stop)| stop - start)
	}

	#[must_use]
	pub fn contains(&self, value: u32) -> bool {
		self.0.is_some_and(|(start, stop)| start <= value && value < stop)
	}

	/// Extends the interval to include `value`; an empty interval becomes
	/// `[value, value + 1)`.
	pub fn add(&mut self, value: u32) {
		self.0 = match self.0 {
			None => Some((value, value + 1)),
			Some((start, stop)) => Some((start.min(value), stop.max(value + 1))),
		};
	}

	/// Extends the interval to cover `other` (monotonic union in place).
	pub fn update(&mut self, other: &Bounds) {
		if let Some((other_start, other_stop)) = other.0 {
			self.0 = match self.0 {
				None => other.0,
				Some((start, stop)) => Some((start.min(other_start), stop.max(other_stop))),
			};
		}
	}

	/// The smallest interval covering both operands.
	#[must_use]
	pub fn union(&self, other: &Bounds) -> Bounds {
		let mut result = *self;
		result.update(other);
		result
	}

	/// Maps both endpoints, keeping the half-open convention: the start is
	/// divided rounding down, the stop rounding up.
	#[must_use]
	pub fn scaled_down(&self, factor: u32) -> Bounds {
		match self.0 {
			None => Bounds(None),
			Some((start, stop)) => Bounds(Some((start / factor, stop.div_ceil(factor)))),
		}
	}

	/// Multiplies both endpoints by `factor`.
	#[must_use]
	pub fn scaled_up(&self, factor: u32) -> Bounds {
		match self.0 {
			None => Bounds(None),
			Some((start, stop)) => Bounds(Some((start * factor, stop * factor))),
		}
	}

	/// Iterates over the contained values in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = u32> {
		let (start, stop) = self.0.unwrap_or((0, 0));
		start..stop
	}
}

impl Debug for Bounds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0 {
			None => write!(f, "Bounds(empty)"),
			Some((start, stop)) => write!(f, "Bounds({start}..{stop})"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn empty() {
		let bounds = Bounds::new_empty();
		assert!(bounds.is_empty());
		assert_eq!(bounds.len(), 0);
		assert_eq!(bounds.start(), None);
		assert_eq!(bounds.iter().count(), 0);
		assert_eq!(Bounds::new(5, 5), bounds);
	}

	#[test]
	fn add_extends() {
		let mut bounds = Bounds::new_empty();
		bounds.add(5);
		assert_eq!(bounds, Bounds::new(5, 6));
		bounds.add(2);
		assert_eq!(bounds, Bounds::new(2, 6));
		bounds.add(9);
		assert_eq!(bounds, Bounds::new(2, 10));
		assert_eq!(bounds.len(), 8);
	}

	#[test]
	fn union_is_pure() {
		let a = Bounds::new(1, 3);
		let b = Bounds::new(5, 6);
		assert_eq!(a.union(&b), Bounds::new(1, 6));
		assert_eq!(a, Bounds::new(1, 3));
		assert_eq!(a.union(&Bounds::new_empty()), a);
		assert_eq!(Bounds::new_empty().union(&b), b);
	}

	#[rstest]
	#[case(Bounds::new(2, 6), 2, Bounds::new(1, 3))]
	#[case(Bounds::new(3, 7), 2, Bounds::new(1, 4))]
	#[case(Bounds::new_empty(), 2, Bounds::new_empty())]
	fn scaled_down_rounds_outward(#[case] bounds: Bounds, #[case] factor: u32, #[case] expected: Bounds) {
		assert_eq!(bounds.scaled_down(factor), expected);
	}

	#[test]
	fn scaled_up_doubles() {
		assert_eq!(Bounds::new(1, 3).scaled_up(2), Bounds::new(2, 6));
	}

	#[test]
	fn iter_values() {
		assert_eq!(Bounds::new(2, 5).iter().collect::<Vec<u32>>(), vec![2, 3, 4]);
	}
}
