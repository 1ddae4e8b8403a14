//! Timing pipeline stages.

use crate::{pipeline::TileFilter, types::Tile};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
	collections::BTreeMap,
	sync::Arc,
	time::{SystemTime, UNIX_EPOCH},
};

/// Running summary statistics over a sequence of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistics {
	n: u64,
	sum: f64,
	sum_of_squares: f64,
	min: f64,
	max: f64,
}

impl Statistics {
	#[must_use]
	pub fn new() -> Statistics {
		Statistics::default()
	}

	pub fn add(&mut self, value: f64) {
		if self.n == 0 {
			self.min = value;
			self.max = value;
		} else {
			self.min = self.min.min(value);
			self.max = self.max.max(value);
		}
		self.n += 1;
		self.sum += value;
		self.sum_of_squares += value * value;
	}

	#[must_use]
	pub fn n(&self) -> u64 {
		self.n
	}

	#[must_use]
	pub fn min(&self) -> Option<f64> {
		(self.n > 0).then_some(self.min)
	}

	#[must_use]
	pub fn max(&self) -> Option<f64> {
		(self.n > 0).then_some(self.max)
	}

	#[must_use]
	pub fn mean(&self) -> Option<f64> {
		(self.n > 0).then(|| self.sum / self.n as f64)
	}

	/// Sample standard deviation; needs at least two samples.
	#[must_use]
	pub fn stdev(&self) -> Option<f64> {
		(self.n > 1).then(|| {
			let n = self.n as f64;
			((self.sum_of_squares - self.sum * self.sum / n) / (n - 1.0)).sqrt()
		})
	}
}

/// Shared registry of stage timings.
///
/// Insert [`sample`](Self::sample) filters in pairs around the stages to
/// time: the first occurrence of a key stamps the tile, the second records
/// the elapsed time into the key's [`Statistics`].
#[derive(Clone, Default)]
pub struct Benchmark {
	statistics: Arc<Mutex<BTreeMap<String, Statistics>>>,
}

impl Benchmark {
	#[must_use]
	pub fn new() -> Benchmark {
		Benchmark::default()
	}

	/// A filter stage participating in the timing for `key`.
	#[must_use]
	pub fn sample(&self, key: impl Into<String>) -> BenchmarkSample {
		BenchmarkSample {
			key: key.into(),
			statistics: self.statistics.clone(),
		}
	}

	/// The statistics recorded so far for `key`.
	#[must_use]
	pub fn statistics(&self, key: &str) -> Option<Statistics> {
		self.statistics.lock().get(key).copied()
	}

	/// All keys with recorded statistics.
	#[must_use]
	pub fn keys(&self) -> Vec<String> {
		self.statistics.lock().keys().cloned().collect()
	}
}

/// One half of a [`Benchmark`] timing pair.
///
/// The start stamp travels on the tile itself (in `metadata`), so the pair
/// works across any combination of stages, including queue hops that carry
/// metadata through.
pub struct BenchmarkSample {
	key: String,
	statistics: Arc<Mutex<BTreeMap<String, Statistics>>>,
}

impl BenchmarkSample {
	fn metadata_key(&self) -> String {
		format!("benchmark_{}", self.key)
	}

	fn now_micros() -> u128 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |elapsed| elapsed.as_micros())
	}
}

#[async_trait]
impl TileFilter for BenchmarkSample {
	async fn filter_tile(&self, mut tile: Tile) -> Result<Option<Tile>> {
		let metadata_key = self.metadata_key();
		let now = Self::now_micros();
		match tile.metadata.get(&metadata_key).and_then(|stamp| stamp.parse::<u128>().ok()) {
			Some(start) => {
				let elapsed_seconds = now.saturating_sub(start) as f64 / 1e6;
				self
					.statistics
					.lock()
					.entry(self.key.clone())
					.or_default()
					.add(elapsed_seconds);
			}
			None => {
				tile.metadata.insert(metadata_key, now.to_string());
			}
		}
		Ok(Some(tile))
	}
}
