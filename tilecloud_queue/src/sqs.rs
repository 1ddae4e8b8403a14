//! A tile job queue on AWS SQS.

use crate::message::{decode_message, encode_message};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_sqs::{
	Client,
	types::{QueueAttributeName, SendMessageBatchRequestEntry},
};
use enumset::EnumSet;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use tilecloud_core::{BackendHandle, StoreCapability, Tile, TileStore, TileStream};

/// SQS caps both receive and send batches at ten messages.
const BATCH_SIZE: usize = 10;

/// A queue store over one SQS queue.
///
/// `put` buffers jobs and flushes them in batches of ten, `list` consumes
/// batched receives and `delete_one` deletes the message a tile was
/// delivered with (SQS re-delivers undeleted messages after the visibility
/// timeout). Call [`flush`](Self::flush) after the last `put` to push out a
/// partial batch.
pub struct SqsTileStore {
	client: Client,
	queue_url: String,
	stop_if_empty: bool,
	visibility_timeout: Duration,
	buffer: Mutex<Vec<String>>,
	decode_failures: AtomicU64,
}

impl SqsTileStore {
	/// Connects with the ambient AWS configuration.
	pub async fn new(queue_url: impl Into<String>) -> SqsTileStore {
		let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
		Self::with_client(Client::new(&config), queue_url)
	}

	#[must_use]
	pub fn with_client(client: Client, queue_url: impl Into<String>) -> SqsTileStore {
		SqsTileStore {
			client,
			queue_url: queue_url.into(),
			stop_if_empty: false,
			visibility_timeout: Duration::from_secs(30),
			buffer: Mutex::new(Vec::new()),
			decode_failures: AtomicU64::new(0),
		}
	}

	/// Terminate consumption once the queue reports no messages at all.
	#[must_use]
	pub fn with_stop_if_empty(mut self, stop_if_empty: bool) -> SqsTileStore {
		self.stop_if_empty = stop_if_empty;
		self
	}

	/// The queue's visibility timeout, used to pace the drain check.
	#[must_use]
	pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> SqsTileStore {
		self.visibility_timeout = visibility_timeout;
		self
	}

	/// Messages skipped because they did not decode to a tile job.
	#[must_use]
	pub fn decode_failures(&self) -> u64 {
		self.decode_failures.load(Ordering::Relaxed)
	}

	/// Sends any buffered jobs out as a final partial batch.
	pub async fn flush(&self) -> Result<()> {
		let batch = std::mem::take(&mut *self.buffer.lock());
		if batch.is_empty() {
			return Ok(());
		}
		self.send_batch(batch).await
	}

	async fn send_batch(&self, batch: Vec<String>) -> Result<()> {
		let mut entries = Vec::with_capacity(batch.len());
		for (index, body) in batch.into_iter().enumerate() {
			entries.push(
				SendMessageBatchRequestEntry::builder()
					.id(index.to_string())
					.message_body(body)
					.build()
					.context("building batch entry")?,
			);
		}
		let output = self
			.client
			.send_message_batch()
			.queue_url(&self.queue_url)
			.set_entries(Some(entries))
			.send()
			.await
			.map_err(|error| anyhow!(error.into_service_error()).context("sending batch"))?;
		for failed in output.failed() {
			log::warn!("queue rejected job {}: {}", failed.id(), failed.message().unwrap_or("?"));
		}
		Ok(())
	}

	/// One batched receive, with broken messages deleted on the spot.
	async fn receive(&self) -> Result<Vec<Tile>> {
		let output = self
			.client
			.receive_message()
			.queue_url(&self.queue_url)
			.max_number_of_messages(BATCH_SIZE as i32)
			.send()
			.await
			.map_err(|error| anyhow!(error.into_service_error()).context("receiving messages"))?;

		let mut tiles = Vec::new();
		for message in output.messages() {
			let Some(receipt_handle) = message.receipt_handle() else {
				continue;
			};
			match message.body().map(decode_message) {
				Some(Ok(mut tile)) => {
					tile.handle = Some(BackendHandle::Sqs {
						receipt_handle: receipt_handle.to_string(),
					});
					tiles.push(tile);
				}
				Some(Err(error)) => {
					self.decode_failures.fetch_add(1, Ordering::Relaxed);
					log::warn!("discarding broken message: {error:#}");
					self.delete_handle(receipt_handle).await?;
				}
				None => {
					self.decode_failures.fetch_add(1, Ordering::Relaxed);
					self.delete_handle(receipt_handle).await?;
				}
			}
		}
		Ok(tiles)
	}

	async fn delete_handle(&self, receipt_handle: &str) -> Result<()> {
		self.client
			.delete_message()
			.queue_url(&self.queue_url)
			.receipt_handle(receipt_handle)
			.send()
			.await
			.map_err(|error| anyhow!(error.into_service_error()).context("deleting message"))?;
		Ok(())
	}

	/// Whether the queue is drained: no visible messages and none in flight.
	///
	/// When messages are merely in flight, waits a quarter of the visibility
	/// timeout before reporting `false`, so callers poll at a sane pace.
	pub async fn on_empty(&self) -> Result<bool> {
		let output = self
			.client
			.get_queue_attributes()
			.queue_url(&self.queue_url)
			.attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
			.attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
			.send()
			.await
			.map_err(|error| anyhow!(error.into_service_error()).context("reading queue attributes"))?;

		let count = |name: &QueueAttributeName| -> u64 {
			output
				.attributes()
				.and_then(|attributes| attributes.get(name))
				.and_then(|value| value.parse().ok())
				.unwrap_or(0)
		};
		let visible = count(&QueueAttributeName::ApproximateNumberOfMessages);
		let in_flight = count(&QueueAttributeName::ApproximateNumberOfMessagesNotVisible);
		if visible == 0 && in_flight == 0 {
			return Ok(true);
		}
		if visible == 0 {
			tokio::time::sleep(self.visibility_timeout / 4).await;
		}
		Ok(false)
	}

	async fn next_batch(&self) -> Option<Vec<Tile>> {
		loop {
			match self.receive().await {
				Ok(tiles) if !tiles.is_empty() => return Some(tiles),
				Ok(_) => {
					if self.stop_if_empty {
						match self.on_empty().await {
							Ok(true) => return None,
							Ok(false) => {}
							Err(error) => {
								log::warn!("queue drain check failed: {error:#}");
								tokio::time::sleep(Duration::from_secs(1)).await;
							}
						}
					}
				}
				Err(error) => {
					log::warn!("receiving from queue failed: {error:#}");
					tokio::time::sleep(Duration::from_secs(1)).await;
				}
			}
		}
	}
}

#[async_trait]
impl TileStore for SqsTileStore {
	fn name(&self) -> &str {
		"sqs"
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let encoded = match encode_message(&tile) {
			Ok(encoded) => encoded,
			Err(error) => return Ok(tile.with_error(error)),
		};
		let batch = {
			let mut buffer = self.buffer.lock();
			buffer.push(encoded);
			if buffer.len() >= BATCH_SIZE {
				Some(std::mem::take(&mut *buffer))
			} else {
				None
			}
		};
		if let Some(batch) = batch {
			if let Err(error) = self.send_batch(batch).await {
				return Ok(tile.with_error(error));
			}
		}
		Ok(tile)
	}

	/// Deletes the message this tile was delivered with.
	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let Some(BackendHandle::Sqs { receipt_handle }) = tile.handle.clone() else {
			let err = anyhow!("tile {} carries no delivery handle", tile.coord);
			return Ok(tile.with_error(err));
		};
		match self.delete_handle(&receipt_handle).await {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(error)),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let batches = stream::unfold((), move |()| async move {
			self.next_batch().await.map(|tiles| (tiles, ()))
		});
		Ok(TileStream::from_inner(batches.flat_map(stream::iter)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_knobs() {
		// No live queue needed to check configuration.
		let config = aws_sdk_sqs::Config::builder()
			.behavior_version(aws_sdk_sqs::config::BehaviorVersion::latest())
			.build();
		let store = SqsTileStore::with_client(Client::from_conf(config), "https://sqs.test/queue")
			.with_stop_if_empty(true)
			.with_visibility_timeout(Duration::from_secs(120));
		assert!(store.stop_if_empty);
		assert_eq!(store.visibility_timeout, Duration::from_secs(120));
		assert_eq!(store.decode_failures(), 0);
	}
}
