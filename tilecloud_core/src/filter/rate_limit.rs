//! Throughput capping.

use crate::{pipeline::TileFilter, types::Tile};
use anyhow::{Result, ensure};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Caps throughput at `hz` tiles per second, measured from the first tile.
///
/// The k-th tile is released no earlier than `first + k/hz`, so short bursts
/// are smoothed rather than counted against a sliding window.
pub struct RateLimit {
	period: Duration,
	state: Mutex<Option<(Instant, u64)>>,
}

impl RateLimit {
	/// # Errors
	/// Fails unless `hz` is positive and finite.
	pub fn new(hz: f64) -> Result<RateLimit> {
		ensure!(hz.is_finite() && hz > 0.0, "rate must be a positive frequency, got {hz}");
		Ok(RateLimit {
			period: Duration::from_secs_f64(1.0 / hz),
			state: Mutex::new(None),
		})
	}
}

#[async_trait]
impl TileFilter for RateLimit {
	async fn filter_tile(&self, tile: Tile) -> Result<Option<Tile>> {
		let deadline = {
			let mut state = self.state.lock();
			match &mut *state {
				None => {
					*state = Some((Instant::now(), 1));
					None
				}
				Some((first, count)) => {
					let deadline = *first + self.period.mul_f64(*count as f64);
					*count += 1;
					Some(deadline)
				}
			}
		};
		if let Some(deadline) = deadline {
			tokio::time::sleep_until(deadline).await;
		}
		Ok(Some(tile))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TileCoord;

	#[test]
	fn rejects_bad_rates() {
		assert!(RateLimit::new(0.0).is_err());
		assert!(RateLimit::new(-1.0).is_err());
		assert!(RateLimit::new(f64::NAN).is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn paces_from_the_first_tile() {
		let limit = RateLimit::new(10.0).unwrap();
		let started = Instant::now();
		for i in 0..4 {
			let tile = Tile::new(TileCoord::new(3, i, 0).unwrap());
			assert!(limit.filter_tile(tile).await.unwrap().is_some());
		}
		// First tile is free; the next three wait 100 ms each.
		assert!(started.elapsed() >= Duration::from_millis(300));
		assert!(started.elapsed() < Duration::from_millis(400));
	}
}
