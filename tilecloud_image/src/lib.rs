//! Image-aware tile stores and filters.
//!
//! Everything here treats `tile.data` as an encoded raster image: splitting
//! rendered metatiles into unit tiles, converting between formats, building
//! coverage masks, synthesizing debug tiles and shelling out to `optipng`.

pub mod formats;

mod converter;
mod debug;
mod font;
mod geometry;
mod mask;
mod optipng;
mod splitter;

pub use converter::ImageFormatConverter;
pub use debug::DebugTileStore;
pub use geometry::IntersectsGeometry;
pub use mask::MaskTileStore;
pub use optipng::OptiPng;
pub use splitter::MetaTileSplitterTileStore;
