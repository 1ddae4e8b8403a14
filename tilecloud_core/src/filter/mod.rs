//! Per-tile pipeline stages.

mod benchmark;
mod content_type;
mod errors;
mod every_nth;
mod gzip;
mod hash_dropper;
mod in_pyramid;
mod logger;
mod rate_limit;

pub use benchmark::{Benchmark, BenchmarkSample, Statistics};
pub use content_type::ContentTypeAdder;
pub use errors::{
	CollectErrors, DropErrors, LogErrors, MaximumConsecutiveErrors, MaximumErrorRate, MaximumErrors,
};
pub use every_nth::EveryNth;
pub use gzip::{GzipCompressor, GzipDecompressor};
pub use hash_dropper::{HashDropper, hash_data};
pub use in_pyramid::InBoundingPyramid;
pub use logger::Logger;
pub use rate_limit::RateLimit;
