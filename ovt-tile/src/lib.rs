//! Encoding and decoding of whole Open Vector Tiles.
//!
//! A tile is a list of layer messages followed by one column cache message. Each layer carries
//! its name, extent and property shape, and one small blob per feature holding the feature's
//! flags and its references into the column cache.
//!
//! Encoding takes a [`VectorTile`] and [`WriteOptions`]. Decoding with [`OvtTile::decode`] reads
//! layer headers up front and decodes features, and their geometry, only when they are asked for.

use bytes::Bytes;
use ovt_error::OvtResult;

pub use extent::*;
pub use feature::*;
pub use feature_type::FeatureType;
pub use layer::*;
pub use model::*;
pub use options::*;
pub use tile::*;

mod extent;
mod feature;
mod feature_type;
mod layer;
mod lazy;
mod model;
mod options;
mod tile;
mod write;

#[cfg(test)]
mod tests;

/// Encode a tile with the default [`WriteOptions`].
pub fn encode(tile: &VectorTile) -> OvtResult<Bytes> {
    WriteOptions::default().write(tile)
}

/// Decode a tile. Features are decoded lazily.
pub fn decode(bytes: impl Into<Bytes>) -> OvtResult<OvtTile> {
    OvtTile::decode(bytes)
}
