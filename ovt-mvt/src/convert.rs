use bytes::Bytes;
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_geometry::Line;
use ovt_shape::{Properties, Value};
use ovt_tile::{Extent, VectorFeature, VectorGeometry, VectorLayer, VectorTile, WriteOptions};
use prost::Message;

use crate::proto::{self, GeomType};
use crate::{classify_rings, decode_commands};

impl From<&proto::Value> for Value {
    fn from(value: &proto::Value) -> Self {
        if let Some(v) = &value.string_value {
            Value::String(v.clone())
        } else if let Some(v) = value.float_value {
            Value::F32(v)
        } else if let Some(v) = value.double_value {
            Value::F64(v)
        } else if let Some(v) = value.int_value {
            Value::I64(v)
        } else if let Some(v) = value.uint_value {
            Value::U64(v)
        } else if let Some(v) = value.sint_value {
            Value::I64(v)
        } else if let Some(v) = value.bool_value {
            Value::Bool(v)
        } else {
            Value::Null
        }
    }
}

/// Resolve a feature's key/value tag pairs against the tables of its layer.
fn properties(feature: &proto::Feature, layer: &proto::Layer) -> OvtResult<Properties> {
    if feature.tags.len() % 2 != 0 {
        ovt_bail!(InvalidSerde: "feature has an odd number of tags ({})", feature.tags.len())
    }
    feature
        .tags
        .chunks_exact(2)
        .map(|pair| {
            let key = layer
                .keys
                .get(pair[0] as usize)
                .ok_or_else(|| ovt_err!(InvalidSerde: "key index {} out of range", pair[0]))?;
            let value = layer
                .values
                .get(pair[1] as usize)
                .ok_or_else(|| ovt_err!(InvalidSerde: "value index {} out of range", pair[1]))?;
            Ok((key.clone(), Value::from(value)))
        })
        .collect()
}

/// Convert one legacy feature into the write model.
///
/// Polygon rings are grouped into polygons by their winding, see [`classify_rings`]. Indices
/// and tessellation of pre-tessellated polygons are carried over.
pub fn from_legacy_feature(
    feature: &proto::Feature,
    layer: &proto::Layer,
) -> OvtResult<VectorFeature> {
    let paths = decode_commands(&feature.geometry)?;
    let raw_type = feature.geom_type.unwrap_or_default();
    let geometry = match GeomType::try_from(raw_type) {
        Ok(GeomType::Point) => VectorGeometry::Points(paths.into_iter().flatten().collect()),
        Ok(GeomType::Linestring) => {
            VectorGeometry::Lines(paths.into_iter().map(Line::new).collect())
        }
        Ok(GeomType::Polygon) => VectorGeometry::polygons(classify_rings(paths))
            .with_indices(feature.indices.clone())
            .with_flat_tessellation(&feature.tessellation)?,
        Ok(GeomType::Unknown) | Err(_) => {
            ovt_bail!(InvalidSerde: "legacy feature has unsupported geometry type {}", raw_type)
        }
    };

    let mut converted =
        VectorFeature::new(geometry).with_properties(properties(feature, layer)?);
    if let Some(id) = feature.id {
        converted = converted.with_id(id);
    }
    Ok(converted)
}

fn convert_layer(layer: &proto::Layer) -> OvtResult<VectorLayer> {
    let extent = Extent::try_from(u64::from(layer.extent.unwrap_or(4096)))?;
    let features = layer
        .features
        .iter()
        .enumerate()
        .map(|(i, f)| {
            from_legacy_feature(f, layer)
                .map_err(|e| e.with_context(format!("converting legacy feature {i}")))
        })
        .collect::<OvtResult<Vec<_>>>()?;
    log::trace!(
        "Converted legacy layer {} (version {}, {} features)",
        layer.name,
        layer.version,
        features.len()
    );
    Ok(VectorLayer {
        features,
        ..VectorLayer::new(layer.name.clone(), extent)
    })
}

/// Read a legacy tile into the write model.
///
/// Layers keep their order. Shapes are left unset, so they are inferred when the tile is encoded.
pub fn decode_legacy(bytes: &[u8]) -> OvtResult<VectorTile> {
    let tile = proto::Tile::decode(bytes)?;
    let layers = tile
        .layers
        .iter()
        .chain(&tile.old_layers)
        .map(|layer| {
            convert_layer(layer)
                .map_err(|e| e.with_context(format!("converting legacy layer {}", layer.name)))
        })
        .collect::<OvtResult<Vec<_>>>()?;
    log::debug!(
        "Decoded legacy tile of {} bytes with {} layers",
        bytes.len(),
        layers.len()
    );
    Ok(VectorTile { layers })
}

/// Re-encode a legacy tile as an Open Vector Tile.
pub fn convert_legacy(bytes: &[u8], options: &WriteOptions) -> OvtResult<Bytes> {
    options.write(&decode_legacy(bytes)?)
}
