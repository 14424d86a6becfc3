use crate::Vertex;

/// A run of points together with its starting distance into a repeating line pattern.
///
/// Lines of a line feature and rings of a polygon share this type.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line<V> {
    pub points: Vec<V>,
    pub offset: f64,
}

impl<V: Vertex> Line<V> {
    pub fn new(points: Vec<V>) -> Self {
        Self {
            points,
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A polygon: an outer ring followed by its holes.
pub type Polygon<V> = Vec<Line<V>>;
