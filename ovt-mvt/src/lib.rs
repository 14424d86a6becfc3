//! Reading of legacy Mapbox Vector Tiles and their conversion into Open Vector Tiles.
//!
//! The legacy format stores each feature's geometry as a stream of drawing commands and its
//! properties as indices into per-layer key and value tables. [`decode_legacy`] turns such a
//! tile into a [`VectorTile`](ovt_tile::VectorTile) and [`convert_legacy`] encodes it straight
//! away.

pub use convert::*;
pub use geometry::*;

mod convert;
mod geometry;
pub mod proto;
