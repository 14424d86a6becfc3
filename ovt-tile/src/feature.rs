use std::cell::OnceCell;
use std::rc::Rc;

use bytes::Bytes;
use ovt_column::{ColumnCacheReader, VertexColumn};
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_geometry::{BoundingBox, Line, Point, Point3D, Polygon, decode_offset, unweave_single};
use ovt_shape::{Properties, Shape, decode_value};
use ovt_wire::WireReader;

use crate::feature_type::FeatureFlags;
use crate::lazy::get_or_try_init;
use crate::{FeatureType, VectorFeature, VectorGeometry};

/// Shapes and cache a feature of a layer is decoded against.
#[derive(Clone)]
pub(crate) struct LayerContext {
    pub cache: Rc<ColumnCacheReader>,
    pub shape: Rc<Shape>,
    pub m_shape: Option<Rc<Shape>>,
}

/// The parts every feature type shares: id, properties, and lazily loaded bbox and M-values.
pub struct FeatureHeader {
    id: Option<u64>,
    properties: Properties,
    bbox_index: Option<u64>,
    m_values_index: Option<u64>,
    m_values: OnceCell<Vec<Properties>>,
    context: LayerContext,
}

impl FeatureHeader {
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn bbox(&self) -> OvtResult<Option<BoundingBox>> {
        self.bbox_index
            .map(|index| self.context.cache.get_bbox(index))
            .transpose()
    }

    pub fn has_m_values(&self) -> bool {
        self.m_values_index.is_some()
    }

    /// Per-vertex M-values, in geometry order.
    pub fn m_values(&self) -> OvtResult<Option<&[Properties]>> {
        let Some(index) = self.m_values_index else {
            return Ok(None);
        };
        let values = get_or_try_init(&self.m_values, || {
            let m_shape = self
                .context
                .m_shape
                .as_deref()
                .ok_or_else(|| ovt_err!(InvalidSerde: "feature has M-values but its layer has no M shape"))?;
            self.context
                .cache
                .get_indices(index)?
                .iter()
                .map(|&value| decode_value(&self.context.cache, m_shape, value))
                .collect()
        })?;
        Ok(Some(values))
    }
}

#[derive(Debug, Clone, Copy)]
enum PointsRef<V> {
    Single(V),
    Column(u64),
}

/// A points feature. The points are resolved from the column cache on first use.
pub struct PointsFeature<V> {
    header: FeatureHeader,
    geometry: PointsRef<V>,
}

impl<V: VertexColumn> PointsFeature<V> {
    fn new(header: FeatureHeader, woven: u64, single: bool) -> Self {
        let geometry = if single {
            PointsRef::Single(unweave_single(woven))
        } else {
            PointsRef::Column(woven)
        };
        Self { header, geometry }
    }

    pub fn header(&self) -> &FeatureHeader {
        &self.header
    }

    pub fn load_geometry(&self) -> OvtResult<&[V]> {
        match &self.geometry {
            PointsRef::Single(point) => Ok(std::slice::from_ref(point)),
            PointsRef::Column(index) => V::get_from(&self.header.context.cache, *index),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LineRef {
    points: u64,
    offset: f64,
}

/// A lines feature. Lines are resolved and memoized on first use.
pub struct LinesFeature<V> {
    header: FeatureHeader,
    lines: Vec<LineRef>,
    loaded: OnceCell<Vec<Line<V>>>,
}

impl<V: VertexColumn> LinesFeature<V> {
    fn new(header: FeatureHeader, lines: Vec<LineRef>) -> Self {
        Self {
            header,
            lines,
            loaded: OnceCell::new(),
        }
    }

    pub fn header(&self) -> &FeatureHeader {
        &self.header
    }

    pub fn load_geometry(&self) -> OvtResult<&[Line<V>]> {
        get_or_try_init(&self.loaded, || {
            resolve_lines(&self.header.context.cache, &self.lines)
        })
        .map(Vec::as_slice)
    }
}

/// A polygons feature, with optional triangle indices and tessellation points.
pub struct PolygonsFeature<V> {
    header: FeatureHeader,
    polygons: Vec<Vec<LineRef>>,
    indices_index: Option<u64>,
    tessellation_index: Option<u64>,
    loaded: OnceCell<Vec<Polygon<V>>>,
    indices: OnceCell<Vec<u32>>,
}

impl<V: VertexColumn> PolygonsFeature<V> {
    fn new(
        header: FeatureHeader,
        polygons: Vec<Vec<LineRef>>,
        indices_index: Option<u64>,
        tessellation_index: Option<u64>,
    ) -> Self {
        Self {
            header,
            polygons,
            indices_index,
            tessellation_index,
            loaded: OnceCell::new(),
            indices: OnceCell::new(),
        }
    }

    pub fn header(&self) -> &FeatureHeader {
        &self.header
    }

    pub fn load_geometry(&self) -> OvtResult<&[Polygon<V>]> {
        get_or_try_init(&self.loaded, || {
            self.polygons
                .iter()
                .map(|rings| resolve_lines(&self.header.context.cache, rings))
                .collect()
        })
        .map(Vec::as_slice)
    }

    /// Triangle indices, empty when the feature has none.
    pub fn indices(&self) -> OvtResult<&[u32]> {
        get_or_try_init(&self.indices, || match self.indices_index {
            None => Ok(Vec::new()),
            Some(index) => self
                .header
                .context
                .cache
                .get_indices(index)?
                .iter()
                .map(|&i| {
                    u32::try_from(i)
                        .map_err(|_| ovt_err!(InvalidSerde: "triangle index {} exceeds u32", i))
                })
                .collect(),
        })
        .map(Vec::as_slice)
    }

    /// Tessellation points, empty when the feature has none.
    pub fn tessellation(&self) -> OvtResult<&[V]> {
        match self.tessellation_index {
            None => Ok(&[]),
            Some(index) => V::get_from(&self.header.context.cache, index),
        }
    }
}

/// Column references of a feature's geometry, before the points are resolved.
enum GeometryRefs {
    Points(u64),
    Lines(Vec<LineRef>),
    Polygons(Vec<Vec<LineRef>>),
}

fn resolve_lines<V: VertexColumn>(
    cache: &ColumnCacheReader,
    lines: &[LineRef],
) -> OvtResult<Vec<Line<V>>> {
    lines
        .iter()
        .map(|line| {
            Ok(Line {
                points: V::get_from(cache, line.points)?.to_vec(),
                offset: line.offset,
            })
        })
        .collect()
}

/// A decoded feature of one of the six types.
///
/// The header and properties are decoded when the feature is first requested from its layer;
/// geometry, bounding box and M-values are decoded on first use and memoized.
pub enum OvtFeature {
    Points(PointsFeature<Point>),
    Lines(LinesFeature<Point>),
    Polygons(PolygonsFeature<Point>),
    Points3D(PointsFeature<Point3D>),
    Lines3D(LinesFeature<Point3D>),
    Polygons3D(PolygonsFeature<Point3D>),
}

impl OvtFeature {
    pub(crate) fn decode(blob: Bytes, context: &LayerContext) -> OvtResult<Self> {
        let mut reader = WireReader::new(blob);
        let feature_type = FeatureType::try_from(reader.read_varint()?)?;
        let bits = reader.read_u8()?;
        let Some(flags) = FeatureFlags::from_bits(bits) else {
            ovt_bail!(InvalidSerde: "feature flags {:#04x} set an unknown bit", bits)
        };
        let id = if flags.contains(FeatureFlags::ID) {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let properties = decode_value(&context.cache, &context.shape, reader.read_varint()?)?;
        let offsets = flags.contains(FeatureFlags::OFFSETS);

        let geometry = match feature_type {
            FeatureType::Points | FeatureType::Points3D => GeometryRefs::Points(reader.read_varint()?),
            FeatureType::Lines | FeatureType::Lines3D => {
                GeometryRefs::Lines(read_lines(&mut reader, offsets)?)
            }
            FeatureType::Polygons | FeatureType::Polygons3D => {
                let count = reader.read_varint()?;
                let mut polygons = Vec::new();
                for _ in 0..count {
                    polygons.push(read_lines(&mut reader, offsets)?);
                }
                GeometryRefs::Polygons(polygons)
            }
        };

        let m_values_index = read_flagged(&mut reader, flags, FeatureFlags::M_VALUES)?;
        if m_values_index.is_some() && context.m_shape.is_none() {
            ovt_bail!(InvalidSerde: "feature has M-values but its layer has no M shape")
        }
        let (indices_index, tessellation_index) = if feature_type.is_polygons() {
            (
                read_flagged(&mut reader, flags, FeatureFlags::INDICES)?,
                read_flagged(&mut reader, flags, FeatureFlags::TESSELLATION)?,
            )
        } else {
            (None, None)
        };
        let bbox_index = read_flagged(&mut reader, flags, FeatureFlags::BBOX)?;
        if reader.has_remaining() {
            ovt_bail!(
                InvalidSerde: "{} feature has {} trailing bytes",
                feature_type,
                reader.remaining()
            )
        }

        let header = FeatureHeader {
            id,
            properties,
            bbox_index,
            m_values_index,
            m_values: OnceCell::new(),
            context: context.clone(),
        };
        let single = flags.contains(FeatureFlags::SINGLE);

        Ok(match (feature_type, geometry) {
            (FeatureType::Points, GeometryRefs::Points(woven)) => {
                Self::Points(PointsFeature::new(header, woven, single))
            }
            (FeatureType::Points3D, GeometryRefs::Points(woven)) => {
                Self::Points3D(PointsFeature::new(header, woven, single))
            }
            (FeatureType::Lines, GeometryRefs::Lines(lines)) => {
                Self::Lines(LinesFeature::new(header, lines))
            }
            (FeatureType::Lines3D, GeometryRefs::Lines(lines)) => {
                Self::Lines3D(LinesFeature::new(header, lines))
            }
            (FeatureType::Polygons, GeometryRefs::Polygons(polygons)) => Self::Polygons(
                PolygonsFeature::new(header, polygons, indices_index, tessellation_index),
            ),
            (FeatureType::Polygons3D, GeometryRefs::Polygons(polygons)) => Self::Polygons3D(
                PolygonsFeature::new(header, polygons, indices_index, tessellation_index),
            ),
            (feature_type, _) => {
                ovt_bail!(AssertionFailed: "geometry does not match feature type {}", feature_type)
            }
        })
    }

    pub fn feature_type(&self) -> FeatureType {
        match self {
            Self::Points(_) => FeatureType::Points,
            Self::Lines(_) => FeatureType::Lines,
            Self::Polygons(_) => FeatureType::Polygons,
            Self::Points3D(_) => FeatureType::Points3D,
            Self::Lines3D(_) => FeatureType::Lines3D,
            Self::Polygons3D(_) => FeatureType::Polygons3D,
        }
    }

    pub fn header(&self) -> &FeatureHeader {
        match self {
            Self::Points(f) => f.header(),
            Self::Lines(f) => f.header(),
            Self::Polygons(f) => f.header(),
            Self::Points3D(f) => f.header(),
            Self::Lines3D(f) => f.header(),
            Self::Polygons3D(f) => f.header(),
        }
    }

    pub fn id(&self) -> Option<u64> {
        self.header().id()
    }

    pub fn properties(&self) -> &Properties {
        self.header().properties()
    }

    pub fn bbox(&self) -> OvtResult<Option<BoundingBox>> {
        self.header().bbox()
    }

    pub fn has_m_values(&self) -> bool {
        self.header().has_m_values()
    }

    pub fn m_values(&self) -> OvtResult<Option<&[Properties]>> {
        self.header().m_values()
    }

    /// Points of a 2D points feature.
    pub fn load_points(&self) -> OvtResult<&[Point]> {
        match self {
            Self::Points(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Points, other.feature_type()),
        }
    }

    /// Lines of a 2D lines feature.
    pub fn load_lines(&self) -> OvtResult<&[Line<Point>]> {
        match self {
            Self::Lines(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Lines, other.feature_type()),
        }
    }

    /// Polygons of a 2D polygons feature.
    pub fn load_polys(&self) -> OvtResult<&[Polygon<Point>]> {
        match self {
            Self::Polygons(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Polygons, other.feature_type()),
        }
    }

    pub fn load_points_3d(&self) -> OvtResult<&[Point3D]> {
        match self {
            Self::Points3D(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Points3D, other.feature_type()),
        }
    }

    pub fn load_lines_3d(&self) -> OvtResult<&[Line<Point3D>]> {
        match self {
            Self::Lines3D(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Lines3D, other.feature_type()),
        }
    }

    pub fn load_polys_3d(&self) -> OvtResult<&[Polygon<Point3D>]> {
        match self {
            Self::Polygons3D(f) => f.load_geometry(),
            other => ovt_bail!(MismatchedTypes: FeatureType::Polygons3D, other.feature_type()),
        }
    }

    /// Triangle indices of a polygons feature; empty for other types.
    pub fn indices(&self) -> OvtResult<&[u32]> {
        match self {
            Self::Polygons(f) => f.indices(),
            Self::Polygons3D(f) => f.indices(),
            _ => Ok(&[]),
        }
    }

    /// The geometry as an owned [`VectorGeometry`], including indices and tessellation.
    pub fn load_geometry(&self) -> OvtResult<VectorGeometry> {
        Ok(match self {
            Self::Points(f) => VectorGeometry::Points(f.load_geometry()?.to_vec()),
            Self::Lines(f) => VectorGeometry::Lines(f.load_geometry()?.to_vec()),
            Self::Polygons(f) => VectorGeometry::Polygons {
                polygons: f.load_geometry()?.to_vec(),
                indices: f.indices()?.to_vec(),
                tessellation: f.tessellation()?.to_vec(),
            },
            Self::Points3D(f) => VectorGeometry::Points3D(f.load_geometry()?.to_vec()),
            Self::Lines3D(f) => VectorGeometry::Lines3D(f.load_geometry()?.to_vec()),
            Self::Polygons3D(f) => VectorGeometry::Polygons3D {
                polygons: f.load_geometry()?.to_vec(),
                indices: f.indices()?.to_vec(),
                tessellation: f.tessellation()?.to_vec(),
            },
        })
    }

    /// Materialize the feature back into the write model.
    pub fn to_vector_feature(&self) -> OvtResult<VectorFeature> {
        Ok(VectorFeature {
            id: self.id(),
            properties: self.properties().clone(),
            geometry: self.load_geometry()?,
            bbox: self.bbox()?,
            m_values: self.m_values()?.map(<[Properties]>::to_vec),
        })
    }
}

fn read_lines(reader: &mut WireReader, offsets: bool) -> OvtResult<Vec<LineRef>> {
    let count = reader.read_varint()?;
    let mut lines = Vec::new();
    for _ in 0..count {
        let points = reader.read_varint()?;
        let offset = if offsets {
            decode_offset(reader.read_svarint()?)
        } else {
            0.0
        };
        lines.push(LineRef { points, offset });
    }
    Ok(lines)
}

fn read_flagged(
    reader: &mut WireReader,
    flags: FeatureFlags,
    flag: FeatureFlags,
) -> OvtResult<Option<u64>> {
    if flags.contains(flag) {
        reader.read_varint().map(Some)
    } else {
        Ok(None)
    }
}
