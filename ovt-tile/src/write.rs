use bytes::Bytes;
use itertools::Itertools;
use ovt_column::{ColumnCacheWriter, ColumnValue, VertexColumn};
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_geometry::{Line, Polygon, encode_offset, weave_single};
use ovt_shape::{Shape, encode_shape, encode_value};
use ovt_wire::WireWriter;

use crate::feature_type::FeatureFlags;
use crate::{VectorFeature, VectorGeometry, VectorLayer, VectorTile, WriteOptions};

pub(crate) const TILE_LAYER_FIELD: u32 = 4;
pub(crate) const TILE_COLUMNS_FIELD: u32 = 5;

pub(crate) const LAYER_VERSION_FIELD: u32 = 1;
pub(crate) const LAYER_NAME_FIELD: u32 = 2;
pub(crate) const LAYER_EXTENT_FIELD: u32 = 3;
pub(crate) const LAYER_FEATURE_FIELD: u32 = 4;
pub(crate) const LAYER_SHAPE_FIELD: u32 = 5;
pub(crate) const LAYER_M_SHAPE_FIELD: u32 = 6;

impl WriteOptions {
    /// Encode a tile.
    ///
    /// Layers are written first while every referenced value is collected in one column cache.
    /// The cache is written last, once its numeric columns can be sorted.
    pub fn write(&self, tile: &VectorTile) -> OvtResult<Bytes> {
        let mut cache = ColumnCacheWriter::new();
        let mut writer = WireWriter::new();
        for layer in &tile.layers {
            writer
                .write_message(TILE_LAYER_FIELD, |w| self.write_layer(layer, &mut cache, w))
                .map_err(|e| e.with_context(format!("encoding layer {}", layer.name)))?;
        }
        writer.write_message(TILE_COLUMNS_FIELD, |w| cache.write(w))?;
        log::debug!(
            "Encoded tile with {} layers into {} bytes",
            tile.layers.len(),
            writer.len()
        );
        Ok(writer.finish())
    }

    fn write_layer(
        &self,
        layer: &VectorLayer,
        cache: &mut ColumnCacheWriter,
        writer: &mut WireWriter,
    ) -> OvtResult<()> {
        let shape = match &layer.shape {
            Some(shape) => shape.clone(),
            None if self.infer_shapes() => Shape::infer(layer.features.iter().map(|f| &f.properties)),
            None => ovt_bail!("layer {} has no shape and shape inference is disabled", layer.name),
        };
        let has_m_values = layer.features.iter().any(|f| f.m_values.is_some());
        let m_shape = match (&layer.m_shape, has_m_values) {
            (_, false) => None,
            (Some(m_shape), true) => Some(m_shape.clone()),
            (None, true) if self.infer_shapes() => Some(Shape::infer(
                layer
                    .features
                    .iter()
                    .filter_map(|f| f.m_values.as_ref())
                    .flatten(),
            )),
            (None, true) => {
                ovt_bail!("layer {} has M-values but no M shape", layer.name)
            }
        };
        log::trace!(
            "Encoding layer {} ({} features, extent {}, shape {})",
            layer.name,
            layer.features.len(),
            layer.extent,
            shape
        );

        writer.write_varint_field(LAYER_VERSION_FIELD, layer.version);
        writer.write_varint_field(LAYER_NAME_FIELD, cache.add_string(&layer.name));
        writer.write_varint_field(LAYER_EXTENT_FIELD, layer.extent.code());
        writer.write_varint_field(LAYER_SHAPE_FIELD, encode_shape(&shape, cache));
        if let Some(m_shape) = &m_shape {
            writer.write_varint_field(LAYER_M_SHAPE_FIELD, encode_shape(m_shape, cache));
        }

        let features: Vec<&VectorFeature> = if self.sort_features_by_type() {
            layer
                .features
                .iter()
                .sorted_by_key(|f| f.feature_type())
                .collect()
        } else {
            layer.features.iter().collect()
        };
        let mut feature_writer = FeatureWriter {
            cache,
            shape: &shape,
            m_shape: m_shape.as_ref(),
        };
        for (i, feature) in features.into_iter().enumerate() {
            let blob = feature_writer
                .write(feature)
                .map_err(|e| e.with_context(format!("encoding feature {i}")))?;
            writer.write_bytes_field(LAYER_FEATURE_FIELD, &blob);
        }
        Ok(())
    }
}

/// Writes feature blobs against the shapes of one layer.
struct FeatureWriter<'a> {
    cache: &'a mut ColumnCacheWriter,
    shape: &'a Shape,
    m_shape: Option<&'a Shape>,
}

impl FeatureWriter<'_> {
    fn write(&mut self, feature: &VectorFeature) -> OvtResult<Bytes> {
        let geometry = &feature.geometry;
        let feature_type = geometry.feature_type();

        if let Some(m_values) = &feature.m_values {
            let vertices = geometry.vertex_count();
            if m_values.len() != vertices {
                ovt_bail!(
                    "feature has {} M-values for {} vertices",
                    m_values.len(),
                    vertices
                )
            }
        }

        let (indices, has_tessellation) = match geometry {
            VectorGeometry::Polygons {
                indices,
                tessellation,
                ..
            } => (indices.as_slice(), !tessellation.is_empty()),
            VectorGeometry::Polygons3D {
                indices,
                tessellation,
                ..
            } => (indices.as_slice(), !tessellation.is_empty()),
            _ => (&[][..], false),
        };
        let single = match geometry {
            VectorGeometry::Points(points) => points.len() == 1,
            VectorGeometry::Points3D(points) => points.len() == 1,
            _ => false,
        } && feature.m_values.is_none();

        let mut flags = FeatureFlags::default();
        flags.set(FeatureFlags::ID, feature.id.is_some());
        flags.set(FeatureFlags::BBOX, feature.bbox.is_some());
        flags.set(FeatureFlags::OFFSETS, has_offsets(geometry));
        flags.set(FeatureFlags::INDICES, !indices.is_empty());
        flags.set(FeatureFlags::TESSELLATION, has_tessellation);
        flags.set(FeatureFlags::M_VALUES, feature.m_values.is_some());
        flags.set(FeatureFlags::SINGLE, single);

        let mut writer = WireWriter::new();
        writer.write_varint(feature_type.code());
        writer.write_u8(flags.bits());
        if let Some(id) = feature.id {
            writer.write_varint(id);
        }
        writer.write_varint(encode_value(&feature.properties, self.shape, self.cache));

        let offsets = flags.contains(FeatureFlags::OFFSETS);
        match geometry {
            VectorGeometry::Points(points) => self.write_points(points, single, &mut writer)?,
            VectorGeometry::Points3D(points) => self.write_points(points, single, &mut writer)?,
            VectorGeometry::Lines(lines) => self.write_lines(lines, offsets, &mut writer)?,
            VectorGeometry::Lines3D(lines) => self.write_lines(lines, offsets, &mut writer)?,
            VectorGeometry::Polygons { polygons, .. } => {
                self.write_polygons(polygons, offsets, &mut writer)?
            }
            VectorGeometry::Polygons3D { polygons, .. } => {
                self.write_polygons(polygons, offsets, &mut writer)?
            }
        }

        if let Some(m_values) = &feature.m_values {
            let m_shape = self
                .m_shape
                .ok_or_else(|| ovt_err!(AssertionFailed: "M-values without an M shape"))?;
            let entries = m_values
                .iter()
                .map(|m| ColumnValue::Index(encode_value(m, m_shape, self.cache)))
                .collect();
            writer.write_varint(self.cache.add_indices(entries));
        }
        if !indices.is_empty() {
            let entries = indices
                .iter()
                .map(|&i| ColumnValue::Index(u64::from(i)))
                .collect();
            writer.write_varint(self.cache.add_indices(entries));
        }
        match geometry {
            VectorGeometry::Polygons { tessellation, .. } if has_tessellation => {
                writer.write_varint(self.cache.add_points(tessellation)?)
            }
            VectorGeometry::Polygons3D { tessellation, .. } if has_tessellation => {
                writer.write_varint(self.cache.add_points_3d(tessellation)?)
            }
            _ => {}
        }
        if let Some(bbox) = &feature.bbox {
            writer.write_varint(self.cache.add_bbox(bbox));
        }
        Ok(writer.finish())
    }

    fn write_points<V: VertexColumn>(
        &mut self,
        points: &[V],
        single: bool,
        writer: &mut WireWriter,
    ) -> OvtResult<()> {
        let geometry = if single {
            weave_single(points[0])?
        } else {
            V::add_to(self.cache, points)?
        };
        writer.write_varint(geometry);
        Ok(())
    }

    fn write_lines<V: VertexColumn>(
        &mut self,
        lines: &[Line<V>],
        offsets: bool,
        writer: &mut WireWriter,
    ) -> OvtResult<()> {
        writer.write_varint(lines.len() as u64);
        for line in lines {
            writer.write_varint(V::add_to(self.cache, &line.points)?);
            if offsets {
                writer.write_svarint(encode_offset(line.offset));
            }
        }
        Ok(())
    }

    fn write_polygons<V: VertexColumn>(
        &mut self,
        polygons: &[Polygon<V>],
        offsets: bool,
        writer: &mut WireWriter,
    ) -> OvtResult<()> {
        writer.write_varint(polygons.len() as u64);
        for polygon in polygons {
            self.write_lines(polygon, offsets, writer)?;
        }
        Ok(())
    }
}

fn has_offsets(geometry: &VectorGeometry) -> bool {
    fn any<V>(lines: &[Line<V>]) -> bool {
        lines.iter().any(|l| l.offset != 0.0)
    }
    match geometry {
        VectorGeometry::Lines(lines) => any(lines),
        VectorGeometry::Lines3D(lines) => any(lines),
        VectorGeometry::Polygons { polygons, .. } => polygons.iter().any(|p| any(p)),
        VectorGeometry::Polygons3D { polygons, .. } => polygons.iter().any(|p| any(p)),
        VectorGeometry::Points(_) | VectorGeometry::Points3D(_) => false,
    }
}
