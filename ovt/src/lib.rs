//! Open Vector Tiles: a columnar re-encoding of Mapbox Vector Tiles.
//!
//! ```
//! use ovt::geometry::Point;
//! use ovt::tile::{Extent, VectorFeature, VectorGeometry, VectorLayer, VectorTile};
//!
//! let tile = VectorTile::new().with_layer(
//!     VectorLayer::new("poi", Extent::E4096)
//!         .with_feature(VectorFeature::new(VectorGeometry::Points(vec![Point::new(1, 2)]))),
//! );
//! let decoded = ovt::decode(ovt::encode(&tile)?)?;
//! assert_eq!(decoded.layer("poi")?.map(|l| l.len()), Some(1));
//! # Ok::<(), ovt::error::OvtError>(())
//! ```

use bytes::Bytes;
pub use ovt_tile::{
    OvtFeature, OvtLayer, OvtTile, VectorFeature, VectorGeometry, VectorLayer, VectorTile,
    WriteOptions,
};
#[cfg(feature = "legacy")]
pub use {ovt_mvt as mvt, ovt_mvt::decode_legacy};
pub use {
    ovt_column as column, ovt_error as error, ovt_geometry as geometry, ovt_shape as shape,
    ovt_tile as tile, ovt_wire as wire,
};

use crate::error::OvtResult;

pub mod encodings {
    pub use {ovt_weave as weave, ovt_zigzag as zigzag};
}

/// Encode a tile with the default [`WriteOptions`].
pub fn encode(tile: &VectorTile) -> OvtResult<Bytes> {
    ovt_tile::encode(tile)
}

/// Decode an Open Vector Tile. Layer headers are read eagerly, features on access.
pub fn decode(bytes: impl Into<Bytes>) -> OvtResult<OvtTile> {
    ovt_tile::decode(bytes)
}

/// Re-encode a legacy Mapbox Vector Tile with the default [`WriteOptions`].
#[cfg(feature = "legacy")]
pub fn convert_legacy(bytes: &[u8]) -> OvtResult<Bytes> {
    ovt_mvt::convert_legacy(bytes, &WriteOptions::default())
}
