//! A tile job queue on a Redis stream with a consumer group.

use crate::message::{decode_message, encode_message};
use ::redis::{
	AsyncCommands, RedisResult,
	aio::MultiplexedConnection,
	streams::{
		StreamClaimReply, StreamId, StreamMaxlen, StreamPendingCountReply, StreamPendingReply,
		StreamRangeReply, StreamReadOptions, StreamReadReply,
	},
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use enumset::EnumSet;
use futures::{StreamExt, stream};
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::{Duration, SystemTime, UNIX_EPOCH},
};
use tilecloud_core::{BackendHandle, StoreCapability, Tile, TileStore, TileStream};

/// The single consumer group every queue uses.
const GROUP: &str = "tilecloud";

/// Tuning knobs of a [`RedisTileStore`].
#[derive(Clone, Debug)]
pub struct RedisQueueOptions {
	/// Queue name; the stream is `queue_<name>`.
	pub name: String,
	/// Terminate consumption once both the read and the pending scan come
	/// back empty. Without it the consumer blocks forever.
	pub stop_if_empty: bool,
	/// Block time of one `XREADGROUP` call.
	pub timeout_ms: u64,
	/// Idle time after which a pending entry of a (presumably dead) consumer
	/// is claimed.
	pub pending_timeout_ms: u64,
	/// Deliveries after which a pending entry is dropped to the errors
	/// stream instead of being claimed again.
	pub max_retries: usize,
	/// Page size of the pending-entry scan.
	pub pending_count: usize,
	/// Error-stream entries older than this are purged by `get_status`.
	pub max_errors_age_ms: u64,
	/// Approximate cap of the errors stream.
	pub max_errors_count: usize,
}

impl RedisQueueOptions {
	#[must_use]
	pub fn new(name: impl Into<String>) -> RedisQueueOptions {
		RedisQueueOptions {
			name: name.into(),
			stop_if_empty: false,
			timeout_ms: 5_000,
			pending_timeout_ms: 5 * 60 * 1_000,
			max_retries: 5,
			pending_count: 10,
			max_errors_age_ms: 24 * 3_600 * 1_000,
			max_errors_count: 1_000,
		}
	}
}

impl Default for RedisQueueOptions {
	fn default() -> RedisQueueOptions {
		RedisQueueOptions::new("tilecloud")
	}
}

/// A point-in-time snapshot of queue health.
#[derive(Clone, Debug)]
pub struct QueueStatus {
	/// Entries currently in the stream, acked or not.
	pub messages: usize,
	/// Entries delivered to some consumer but not yet acked.
	pub pending: usize,
	/// Coordinate strings of recently dropped jobs.
	pub errors: Vec<String>,
}

/// A queue store over one Redis stream.
///
/// `put` publishes jobs with `XADD`, `list` consumes them through the
/// `tilecloud` consumer group and `delete_one` acknowledges (`XACK` then
/// `XDEL`) the entry a tile was delivered with. When no new entries arrive,
/// stale pending entries of other consumers are claimed; entries past
/// `max_retries` deliveries are dropped onto a capped `<stream>_errors`
/// stream instead.
pub struct RedisTileStore {
	conn: MultiplexedConnection,
	status_conn: MultiplexedConnection,
	stream: String,
	errors_stream: String,
	consumer: String,
	options: RedisQueueOptions,
	decode_failures: AtomicU64,
	dropped_messages: AtomicU64,
}

impl RedisTileStore {
	/// Connects to `url` and creates the stream and consumer group if needed.
	pub async fn connect(url: &str, options: RedisQueueOptions) -> Result<RedisTileStore> {
		let client = ::redis::Client::open(url).with_context(|| format!("invalid redis url '{url}'"))?;
		let conn = client
			.get_multiplexed_async_connection()
			.await
			.with_context(|| format!("connecting to '{url}'"))?;
		Self::with_connections(conn.clone(), conn, options).await
	}

	/// Like [`connect`](Self::connect), with a second, read-only connection
	/// (e.g. a replica) used for status queries.
	pub async fn connect_with_replica(
		url: &str,
		replica_url: &str,
		options: RedisQueueOptions,
	) -> Result<RedisTileStore> {
		let client = ::redis::Client::open(url).with_context(|| format!("invalid redis url '{url}'"))?;
		let conn = client
			.get_multiplexed_async_connection()
			.await
			.with_context(|| format!("connecting to '{url}'"))?;
		let replica = ::redis::Client::open(replica_url)
			.with_context(|| format!("invalid redis url '{replica_url}'"))?;
		let status_conn = replica
			.get_multiplexed_async_connection()
			.await
			.with_context(|| format!("connecting to '{replica_url}'"))?;
		Self::with_connections(conn, status_conn, options).await
	}

	async fn with_connections(
		mut conn: MultiplexedConnection,
		status_conn: MultiplexedConnection,
		options: RedisQueueOptions,
	) -> Result<RedisTileStore> {
		let stream = format!("queue_{}", options.name);
		let created: RedisResult<()> = ::redis::cmd("XGROUP")
			.arg("CREATE")
			.arg(&stream)
			.arg(GROUP)
			.arg("0")
			.arg("MKSTREAM")
			.query_async(&mut conn)
			.await;
		if let Err(error) = created {
			// The group surviving from an earlier run is fine.
			if error.code() != Some("BUSYGROUP") {
				return Err(anyhow::Error::new(error).context(format!("creating group on '{stream}'")));
			}
		}
		Ok(RedisTileStore {
			conn,
			status_conn,
			errors_stream: format!("{stream}_errors"),
			stream,
			consumer: format!("{}:{}", gethostname::gethostname().to_string_lossy(), std::process::id()),
			options,
			decode_failures: AtomicU64::new(0),
			dropped_messages: AtomicU64::new(0),
		})
	}

	/// Messages skipped because they did not decode to a tile job.
	#[must_use]
	pub fn decode_failures(&self) -> u64 {
		self.decode_failures.load(Ordering::Relaxed)
	}

	/// Messages dropped to the errors stream after too many deliveries.
	#[must_use]
	pub fn dropped_messages(&self) -> u64 {
		self.dropped_messages.load(Ordering::Relaxed)
	}

	/// Queue length, pending count and recent errors; purges error-stream
	/// entries older than `max_errors_age_ms` on the way.
	pub async fn get_status(&self) -> Result<QueueStatus> {
		let mut conn = self.status_conn.clone();
		let messages: usize = conn.xlen(&self.stream).await.context("XLEN")?;
		let pending: StreamPendingReply = conn.xpending(&self.stream, GROUP).await.context("XPENDING")?;
		let pending = match pending {
			StreamPendingReply::Empty => 0,
			StreamPendingReply::Data(data) => data.count,
		};

		let range: StreamRangeReply = conn
			.xrange(&self.errors_stream, "-", "+")
			.await
			.context("reading errors stream")?;
		let oldest_wanted = now_ms().saturating_sub(self.options.max_errors_age_ms);
		let mut errors = Vec::new();
		for entry in range.ids {
			if entry_timestamp_ms(&entry.id) < oldest_wanted {
				let _: usize = conn.xdel(&self.errors_stream, &[&entry.id]).await.context("XDEL")?;
			} else if let Some(tilecoord) = entry.get::<String>("tilecoord") {
				errors.push(tilecoord);
			}
		}
		Ok(QueueStatus {
			messages,
			pending,
			errors,
		})
	}

	/// Acks and removes a broken entry so it is never re-delivered.
	async fn discard(&self, conn: &mut MultiplexedConnection, id: &str, reason: &str) {
		self.decode_failures.fetch_add(1, Ordering::Relaxed);
		log::warn!("discarding entry {id} from '{}': {reason}", self.stream);
		let _: RedisResult<usize> = conn.xack(&self.stream, GROUP, &[id]).await;
		let _: RedisResult<usize> = conn.xdel(&self.stream, &[id]).await;
	}

	async fn decode_entry(&self, conn: &mut MultiplexedConnection, entry: StreamId) -> Option<Tile> {
		let Some(text) = entry.get::<String>("message") else {
			self.discard(conn, &entry.id, "no 'message' field").await;
			return None;
		};
		match decode_message(&text) {
			Ok(mut tile) => {
				tile.handle = Some(BackendHandle::Redis { id: entry.id });
				Some(tile)
			}
			Err(error) => {
				self.discard(conn, &entry.id, &format!("{error:#}")).await;
				None
			}
		}
	}

	/// One blocking `XREADGROUP` for fresh entries.
	async fn read_new(&self, conn: &mut MultiplexedConnection) -> RedisResult<Vec<Tile>> {
		let options = StreamReadOptions::default()
			.group(GROUP, &self.consumer)
			.count(self.options.pending_count)
			.block(self.options.timeout_ms as usize);
		let reply: StreamReadReply = conn.xread_options(&[&self.stream], &[">"], &options).await?;
		let mut tiles = Vec::new();
		for key in reply.keys {
			for entry in key.ids {
				if let Some(tile) = self.decode_entry(conn, entry).await {
					tiles.push(tile);
				}
			}
		}
		Ok(tiles)
	}

	/// Scans one page of pending entries and claims the stale ones.
	///
	/// Returns `None` when there is nothing pending at all, which together
	/// with an empty read means the queue is drained.
	async fn claim_stale(&self, conn: &mut MultiplexedConnection) -> RedisResult<Option<Vec<Tile>>> {
		let pending: StreamPendingCountReply = conn
			.xpending_count(&self.stream, GROUP, "-", "+", self.options.pending_count)
			.await?;
		if pending.ids.is_empty() {
			return Ok(None);
		}

		let mut tiles = Vec::new();
		for entry in pending.ids {
			let action = pending_action(entry.last_delivered_ms as u64, entry.times_delivered, &self.options);
			if action == PendingAction::Leave {
				continue;
			}
			let claimed: StreamClaimReply = conn
				.xclaim(
					&self.stream,
					GROUP,
					&self.consumer,
					self.options.pending_timeout_ms as usize,
					&[&entry.id],
				)
				.await?;
			if action == PendingAction::Reclaim {
				for claimed_entry in claimed.ids {
					if let Some(tile) = self.decode_entry(conn, claimed_entry).await {
						tiles.push(tile);
					}
				}
			} else {
				// Too many deliveries: record the coordinate and bury it.
				for claimed_entry in claimed.ids {
					let tilecoord = claimed_entry
						.get::<String>("message")
						.and_then(|text| decode_message(&text).ok())
						.map_or_else(|| claimed_entry.id.clone(), |tile| tile.coord.to_string());
					log::warn!(
						"dropping {tilecoord} from '{}' after {} deliveries",
						self.stream,
						entry.times_delivered
					);
					let _: String = conn
						.xadd_maxlen(
							&self.errors_stream,
							StreamMaxlen::Approx(self.options.max_errors_count),
							"*",
							&[("tilecoord", tilecoord.as_str())],
						)
						.await?;
					let _: usize = conn.xack(&self.stream, GROUP, &[&claimed_entry.id]).await?;
					let _: usize = conn.xdel(&self.stream, &[&claimed_entry.id]).await?;
					self.dropped_messages.fetch_add(1, Ordering::Relaxed);
				}
			}
		}
		Ok(Some(tiles))
	}

	/// The consumption loop behind `list`; `None` terminates the stream.
	async fn next_batch(&self, conn: &mut MultiplexedConnection) -> Option<Vec<Tile>> {
		loop {
			match self.read_new(conn).await {
				Ok(tiles) if !tiles.is_empty() => return Some(tiles),
				Ok(_) => {}
				Err(error) => {
					if error.is_timeout() {
						log::debug!("redis read timed out, retrying");
					} else {
						log::warn!("reading '{}' failed: {error}", self.stream);
					}
					tokio::time::sleep(Duration::from_secs(1)).await;
					continue;
				}
			}
			match self.claim_stale(conn).await {
				Ok(Some(tiles)) if !tiles.is_empty() => return Some(tiles),
				Ok(Some(_)) => {} // stale entries were buried, read again
				Ok(None) => {
					if self.options.stop_if_empty {
						return None;
					}
				}
				Err(error) => {
					log::warn!("claiming pending entries of '{}' failed: {error}", self.stream);
					tokio::time::sleep(Duration::from_secs(1)).await;
				}
			}
		}
	}
}

/// What to do with a pending entry of the consumer group.
#[derive(Debug, PartialEq, Eq)]
enum PendingAction {
	/// Still within its idle grace period; its consumer may yet ack it.
	Leave,
	/// Stale but within the retry budget: claim and re-deliver.
	Reclaim,
	/// Stale and out of retries: claim, bury to the errors stream.
	Drop,
}

fn pending_action(idle_ms: u64, times_delivered: usize, options: &RedisQueueOptions) -> PendingAction {
	if idle_ms < options.pending_timeout_ms {
		PendingAction::Leave
	} else if times_delivered <= options.max_retries {
		PendingAction::Reclaim
	} else {
		PendingAction::Drop
	}
}

fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Milliseconds part of a stream entry id (`<ms>-<seq>`).
fn entry_timestamp_ms(id: &str) -> u64 {
	id.split('-').next().and_then(|ms| ms.parse().ok()).unwrap_or(0)
}

#[async_trait]
impl TileStore for RedisTileStore {
	fn name(&self) -> &str {
		&self.stream
	}

	fn capabilities(&self) -> EnumSet<StoreCapability> {
		StoreCapability::Put | StoreCapability::Delete | StoreCapability::List
	}

	async fn put_one(&self, tile: Tile) -> Result<Tile> {
		let encoded = match encode_message(&tile) {
			Ok(encoded) => encoded,
			Err(error) => return Ok(tile.with_error(error)),
		};
		let mut conn = self.conn.clone();
		let added: RedisResult<String> = conn.xadd(&self.stream, "*", &[("message", encoded.as_str())]).await;
		match added {
			Ok(_) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("publishing to '{}'", self.stream)),
			)),
		}
	}

	/// Acks the stream entry this tile was delivered with.
	async fn delete_one(&self, tile: Tile) -> Result<Tile> {
		let Some(BackendHandle::Redis { id }) = tile.handle.clone() else {
			let err = anyhow!("tile {} carries no delivery handle", tile.coord);
			return Ok(tile.with_error(err));
		};
		let mut conn = self.conn.clone();
		let ack = async {
			let _: usize = conn.xack(&self.stream, GROUP, &[&id]).await?;
			let _: usize = conn.xdel(&self.stream, &[&id]).await?;
			RedisResult::Ok(())
		};
		match ack.await {
			Ok(()) => Ok(tile),
			Err(error) => Ok(tile.with_error(
				anyhow::Error::new(error).context(format!("acknowledging entry {id}")),
			)),
		}
	}

	fn list(&self) -> Result<TileStream<'_>> {
		let conn = self.conn.clone();
		let batches = stream::unfold(conn, move |mut conn| async move {
			self.next_batch(&mut conn).await.map(|tiles| (tiles, conn))
		});
		Ok(TileStream::from_inner(batches.flat_map(stream::iter)))
	}
}
