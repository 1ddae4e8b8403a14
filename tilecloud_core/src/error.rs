//! Sentinel error types used across the toolkit.
//!
//! All fallible APIs return `anyhow::Result`; these types exist so that
//! callers can `downcast_ref` to distinguish the three behaviours the
//! pipeline cares about: an operation a store does not implement, a
//! malformed coordinate/pyramid string, and the error-threshold abort raised
//! by the error-limiting filters. Per-tile backend failures never use these;
//! they are annotated on [`Tile::error`](crate::Tile).

use thiserror::Error;

/// Returned synchronously when a store is asked for an operation it does not
/// implement, e.g. `put` on an HTTP store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store '{store}' does not support '{operation}'")]
pub struct UnsupportedOperation {
	/// Name of the store that rejected the operation.
	pub store: String,
	/// Name of the rejected operation.
	pub operation: String,
}

impl UnsupportedOperation {
	pub fn new(store: &str, operation: &str) -> Self {
		UnsupportedOperation {
			store: store.to_string(),
			operation: operation.to_string(),
		}
	}
}

/// Raised by the tile-coordinate and bounding-pyramid string parsers.
///
/// Never silently coerced: a malformed `z/x/y` or pyramid DSL string is a
/// caller error and aborts immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error: {0}")]
pub struct ParseError(pub String);

impl ParseError {
	pub fn new(message: impl Into<String>) -> Self {
		ParseError(message.into())
	}
}

/// Raised by the `Maximum*Errors` filters to abort a pipeline whose error
/// budget is exhausted. Propagates out of `Pipeline::consume`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("too many errors: {0}")]
pub struct TooManyErrors(pub String);
