//! Queue-backed tile stores.
//!
//! A queue store carries tile *jobs*, not tile payloads: `put` publishes the
//! coordinate (plus metadata) as a message, `list` consumes messages into
//! bare tiles, and `delete_one` acknowledges the message a tile was delivered
//! with. Workers around a shared queue get at-least-once delivery; a worker
//! that crashes before acknowledging leaves its messages to be re-delivered.

mod message;
mod redis;
mod sqs;

pub use message::{decode_message, encode_message};
pub use redis::{QueueStatus, RedisQueueOptions, RedisTileStore};
pub use sqs::SqsTileStore;
