use std::cell::OnceCell;
use std::rc::Rc;

use bytes::Bytes;
use ovt_column::ColumnCacheReader;
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_shape::{Shape, decode_shape};
use ovt_wire::{WireReader, WireType};

use crate::feature::LayerContext;
use crate::lazy::get_or_try_init;
use crate::write::{
    LAYER_EXTENT_FIELD, LAYER_FEATURE_FIELD, LAYER_M_SHAPE_FIELD, LAYER_NAME_FIELD,
    LAYER_SHAPE_FIELD, LAYER_VERSION_FIELD,
};
use crate::{Extent, OvtFeature, VectorLayer};

/// A layer of a decoded tile.
///
/// The layer header and shapes are read when the tile is decoded, together with the byte range of
/// every feature. Features themselves are decoded on request and kept.
pub struct OvtLayer {
    version: u64,
    name: String,
    extent: Extent,
    context: LayerContext,
    features: Vec<Bytes>,
    decoded: Vec<OnceCell<OvtFeature>>,
}

impl OvtLayer {
    pub(crate) fn decode(body: Bytes, cache: Rc<ColumnCacheReader>) -> OvtResult<Self> {
        let mut version = 1;
        let mut name_index = None;
        let mut extent_code = None;
        let mut shape_index = None;
        let mut m_shape_index = None;
        let mut features = Vec::new();

        let mut reader = WireReader::new(body);
        let end = reader.len();
        reader.read_fields(end, |field, wire_type, r| {
            match field {
                LAYER_FEATURE_FIELD => {
                    wire_type.ensure(WireType::LengthDelimited)?;
                    features.push(r.read_bytes()?);
                    return Ok(());
                }
                LAYER_VERSION_FIELD
                | LAYER_NAME_FIELD
                | LAYER_EXTENT_FIELD
                | LAYER_SHAPE_FIELD
                | LAYER_M_SHAPE_FIELD => wire_type.ensure(WireType::Varint)?,
                _ => return Ok(()),
            }
            let value = r.read_varint()?;
            match field {
                LAYER_VERSION_FIELD => version = value,
                LAYER_NAME_FIELD => name_index = Some(value),
                LAYER_EXTENT_FIELD => extent_code = Some(value),
                LAYER_SHAPE_FIELD => shape_index = Some(value),
                _ => m_shape_index = Some(value),
            }
            Ok(())
        })?;

        let name = cache
            .get_string(name_index.ok_or_else(|| ovt_err!(InvalidSerde: "layer has no name"))?)?
            .to_string();
        let Some(shape_index) = shape_index else {
            ovt_bail!(InvalidSerde: "layer {} has no shape", name)
        };
        let extent = match extent_code {
            Some(code) => Extent::from_code(code)?,
            None => Extent::default(),
        };
        let shape = Rc::new(decode_shape(&cache, shape_index)?);
        let m_shape = m_shape_index
            .map(|index| decode_shape(&cache, index).map(Rc::new))
            .transpose()?;
        log::trace!(
            "Decoded layer {} (version {}, extent {}, {} features, shape {})",
            name,
            version,
            extent,
            features.len(),
            shape
        );

        Ok(Self {
            version,
            name,
            extent,
            context: LayerContext {
                cache,
                shape,
                m_shape,
            },
            decoded: features.iter().map(|_| OnceCell::new()).collect(),
            features,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn shape(&self) -> &Shape {
        &self.context.shape
    }

    pub fn m_shape(&self) -> Option<&Shape> {
        self.context.m_shape.as_deref()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Decode the feature at `index`, or return it if it was decoded before.
    pub fn feature(&self, index: usize) -> OvtResult<&OvtFeature> {
        let (Some(blob), Some(cell)) = (self.features.get(index), self.decoded.get(index)) else {
            ovt_bail!(FeatureIndexOutOfBounds: index, self.features.len())
        };
        get_or_try_init(cell, || {
            log::trace!("Decoding feature {} of layer {}", index, self.name);
            OvtFeature::decode(blob.clone(), &self.context).map_err(|e| {
                e.with_context(format!("decoding feature {index} of layer {}", self.name))
            })
        })
    }

    pub fn features(&self) -> impl Iterator<Item = OvtResult<&OvtFeature>> {
        (0..self.len()).map(|i| self.feature(i))
    }

    /// Materialize the layer back into the write model, shapes included.
    pub fn to_vector_layer(&self) -> OvtResult<VectorLayer> {
        Ok(VectorLayer {
            version: self.version,
            name: self.name.clone(),
            extent: self.extent,
            shape: Some(self.shape().clone()),
            m_shape: self.m_shape().cloned(),
            features: self
                .features()
                .map(|f| f?.to_vector_feature())
                .collect::<OvtResult<_>>()?,
        })
    }
}
