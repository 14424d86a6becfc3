use std::cell::OnceCell;
use std::rc::Rc;

use bytes::Bytes;
use ovt_column::ColumnCacheReader;
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_wire::{WireReader, WireType};

use crate::lazy::get_or_try_init;
use crate::write::{LAYER_NAME_FIELD, TILE_COLUMNS_FIELD, TILE_LAYER_FIELD};
use crate::{OvtLayer, VectorTile};

/// A layer located by the tile scan. Only its name is read up front.
struct LayerEntry {
    name: String,
    body: Bytes,
    decoded: OnceCell<OvtLayer>,
}

/// A decoded tile: its layers in wire order and the column cache they share.
pub struct OvtTile {
    cache: Rc<ColumnCacheReader>,
    layers: Vec<LayerEntry>,
}

impl OvtTile {
    /// Decode a tile.
    ///
    /// One pass over the top-level fields locates the layers and the column cache, and each
    /// layer's name is resolved so layers can be found by name. The rest of a layer header, its
    /// shapes and its feature table are decoded on first access.
    pub fn decode(bytes: impl Into<Bytes>) -> OvtResult<Self> {
        let mut reader = WireReader::new(bytes);
        let end = reader.len();
        let mut layer_bodies = Vec::new();
        let mut columns = None;
        reader.read_fields(end, |field, wire_type, r| {
            match field {
                TILE_LAYER_FIELD => {
                    wire_type.ensure(WireType::LengthDelimited)?;
                    layer_bodies.push(r.read_bytes()?);
                }
                TILE_COLUMNS_FIELD => {
                    wire_type.ensure(WireType::LengthDelimited)?;
                    columns = Some(r.read_bytes()?);
                }
                _ => {}
            }
            Ok(())
        })?;

        let cache = Rc::new(match columns {
            Some(body) => ColumnCacheReader::new(body)?,
            None => ColumnCacheReader::empty(),
        });
        let layers = layer_bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let name = layer_name(&body, &cache)
                    .map_err(|e| e.with_context(format!("locating layer {i}")))?;
                Ok(LayerEntry {
                    name,
                    body,
                    decoded: OnceCell::new(),
                })
            })
            .collect::<OvtResult<Vec<_>>>()?;
        log::debug!("Decoded tile of {} bytes with {} layers", end, layers.len());
        Ok(Self { cache, layers })
    }

    /// The layer called `name`, or `None` if the tile has no such layer.
    ///
    /// The layer is decoded on the first call and kept.
    pub fn layer(&self, name: &str) -> OvtResult<Option<&OvtLayer>> {
        self.layers
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| self.load(entry))
            .transpose()
    }

    /// The layer at `index` in wire order.
    pub fn layer_at(&self, index: usize) -> OvtResult<&OvtLayer> {
        let Some(entry) = self.layers.get(index) else {
            ovt_bail!(OutOfBounds: index, 0, self.layers.len())
        };
        self.load(entry)
    }

    pub fn layers(&self) -> impl Iterator<Item = OvtResult<&OvtLayer>> {
        self.layers.iter().map(move |entry| self.load(entry))
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|entry| entry.name.as_str())
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Decode every feature and materialize the whole tile into the write model.
    pub fn to_vector_tile(&self) -> OvtResult<VectorTile> {
        Ok(VectorTile {
            layers: self
                .layers()
                .map(|layer| layer?.to_vector_layer())
                .collect::<OvtResult<_>>()?,
        })
    }

    fn load<'a>(&'a self, entry: &'a LayerEntry) -> OvtResult<&'a OvtLayer> {
        get_or_try_init(&entry.decoded, || {
            OvtLayer::decode(entry.body.clone(), self.cache.clone())
                .map_err(|e| e.with_context(format!("decoding layer {}", entry.name)))
        })
    }
}

/// Read only the name field of a layer message.
fn layer_name(body: &Bytes, cache: &ColumnCacheReader) -> OvtResult<String> {
    let mut reader = WireReader::new(body.clone());
    let end = reader.len();
    let mut name_index = None;
    reader.read_fields(end, |field, wire_type, r| {
        if field == LAYER_NAME_FIELD {
            wire_type.ensure(WireType::Varint)?;
            name_index = Some(r.read_varint()?);
        }
        Ok(())
    })?;
    let index = name_index.ok_or_else(|| ovt_err!(InvalidSerde: "layer has no name"))?;
    Ok(cache.get_string(index)?.to_string())
}
