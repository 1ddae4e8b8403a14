//! # TileCloud
//!
//! A toolkit for moving, transforming and generating map tiles between
//! heterogeneous tile stores: local files, MBTiles, ZIP archives, object
//! storage, HTTP endpoints, caches and job queues.
//!
//! Tiles flow through a [`Pipeline`](core::Pipeline) built from stores and
//! filters; [`load`] turns a URI like `tiles.mbtiles` or
//! `s3://bucket/%(z)d/%(x)d/%(y)d.png` into the matching store.
//!
//! ```no_run
//! use tilecloud::{core::Pipeline, load};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = load("world.mbtiles").await?;
//!     let sink = load("file://cache/%(z)d/%(x)d/%(y)d.png").await?;
//!
//!     let copied = Pipeline::list(source.as_ref())?
//!         .get(source.as_ref())?
//!         .put(sink.as_ref())?
//!         .consume(None)
//!         .await?;
//!     println!("copied {copied} tiles");
//!     Ok(())
//! }
//! ```

mod loader;

pub use loader::{default_registry, load};

pub use tilecloud_core as core;
pub use tilecloud_image as image;
pub use tilecloud_queue as queue;
pub use tilecloud_store as store;
