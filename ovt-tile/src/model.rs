//! The in-memory tile that [`WriteOptions::write`](crate::WriteOptions::write) encodes.

use ovt_error::OvtResult;
use ovt_geometry::{BoundingBox, Line, Point, Point3D, Polygon, Vertex};
use ovt_shape::{Properties, Shape};

use crate::{Extent, FeatureType};

/// Geometry of a feature, one variant per feature type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VectorGeometry {
    Points(Vec<Point>),
    Lines(Vec<Line<Point>>),
    Polygons {
        polygons: Vec<Polygon<Point>>,
        /// Triangle indices into the polygon vertices, in geometry order.
        indices: Vec<u32>,
        /// Extra interior points used when triangulating.
        tessellation: Vec<Point>,
    },
    Points3D(Vec<Point3D>),
    Lines3D(Vec<Line<Point3D>>),
    Polygons3D {
        polygons: Vec<Polygon<Point3D>>,
        indices: Vec<u32>,
        tessellation: Vec<Point3D>,
    },
}

impl VectorGeometry {
    pub fn polygons(polygons: Vec<Polygon<Point>>) -> Self {
        Self::Polygons {
            polygons,
            indices: Vec::new(),
            tessellation: Vec::new(),
        }
    }

    pub fn polygons_3d(polygons: Vec<Polygon<Point3D>>) -> Self {
        Self::Polygons3D {
            polygons,
            indices: Vec::new(),
            tessellation: Vec::new(),
        }
    }

    /// Attach a tessellation given as flat `x, y` (or `x, y, z`) coordinates.
    ///
    /// Returns the geometry unchanged for non-polygon types.
    pub fn with_flat_tessellation(mut self, coords: &[i32]) -> OvtResult<Self> {
        match &mut self {
            Self::Polygons { tessellation, .. } => *tessellation = Point::from_flat(coords)?,
            Self::Polygons3D { tessellation, .. } => *tessellation = Point3D::from_flat(coords)?,
            _ => {}
        }
        Ok(self)
    }

    pub fn with_indices(mut self, triangles: Vec<u32>) -> Self {
        if let Self::Polygons { indices, .. } | Self::Polygons3D { indices, .. } = &mut self {
            *indices = triangles;
        }
        self
    }

    pub fn feature_type(&self) -> FeatureType {
        match self {
            Self::Points(_) => FeatureType::Points,
            Self::Lines(_) => FeatureType::Lines,
            Self::Polygons { .. } => FeatureType::Polygons,
            Self::Points3D(_) => FeatureType::Points3D,
            Self::Lines3D(_) => FeatureType::Lines3D,
            Self::Polygons3D { .. } => FeatureType::Polygons3D,
        }
    }

    /// Number of vertices, not counting tessellation points.
    pub fn vertex_count(&self) -> usize {
        fn lines<V: Vertex>(lines: &[Line<V>]) -> usize {
            lines.iter().map(Line::len).sum()
        }
        match self {
            Self::Points(points) => points.len(),
            Self::Points3D(points) => points.len(),
            Self::Lines(l) => lines(l),
            Self::Lines3D(l) => lines(l),
            Self::Polygons { polygons, .. } => polygons.iter().map(|p| lines(p)).sum(),
            Self::Polygons3D { polygons, .. } => polygons.iter().map(|p| lines(p)).sum(),
        }
    }
}

/// A feature to be encoded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorFeature {
    pub id: Option<u64>,
    pub properties: Properties,
    pub geometry: VectorGeometry,
    pub bbox: Option<BoundingBox>,
    /// One properties object per vertex, described by the layer's M shape.
    pub m_values: Option<Vec<Properties>>,
}

impl VectorFeature {
    pub fn new(geometry: VectorGeometry) -> Self {
        Self {
            id: None,
            properties: Properties::new(),
            geometry,
            bbox: None,
            m_values: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_bbox(mut self, bbox: impl Into<BoundingBox>) -> Self {
        self.bbox = Some(bbox.into());
        self
    }

    pub fn with_m_values(mut self, m_values: Vec<Properties>) -> Self {
        self.m_values = Some(m_values);
        self
    }

    pub fn feature_type(&self) -> FeatureType {
        self.geometry.feature_type()
    }
}

/// A named group of features sharing an extent and a property shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorLayer {
    pub version: u64,
    pub name: String,
    pub extent: Extent,
    /// The property shape. Inferred from the features when absent.
    pub shape: Option<Shape>,
    /// The M-value shape. Inferred from the features when absent.
    pub m_shape: Option<Shape>,
    pub features: Vec<VectorFeature>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, extent: Extent) -> Self {
        Self {
            version: 1,
            name: name.into(),
            extent,
            shape: None,
            m_shape: None,
            features: Vec::new(),
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_m_shape(mut self, m_shape: Shape) -> Self {
        self.m_shape = Some(m_shape);
        self
    }

    pub fn with_feature(mut self, feature: VectorFeature) -> Self {
        self.features.push(feature);
        self
    }
}

/// An ordered list of layers.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorTile {
    pub layers: Vec<VectorLayer>,
}

impl VectorTile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: VectorLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layer(&self, name: &str) -> Option<&VectorLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}
