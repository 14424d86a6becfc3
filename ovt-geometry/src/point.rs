use std::fmt::{Debug, Display, Formatter};

use ovt_error::{OvtResult, ovt_bail};
use ovt_weave::{WEAVE_3D_MAX, unweave_2d, unweave_3d, weave_2d, weave_3d};
use ovt_zigzag::{zigzag_decode_i32, zigzag_encode_i32};

/// A point in two-dimensional tile space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A point in three-dimensional tile space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point3D {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for Point3D {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl Display for Point3D {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A point type that can be packed into a single woven integer.
///
/// Implemented for [`Point`] and [`Point3D`]; the feature codec is generic over it so that the
/// 2D and 3D geometry variants share one code path.
pub trait Vertex: Copy + Default + PartialEq + Debug + Display {
    /// Number of coordinates per point.
    const DIMENSIONS: usize;

    /// Zigzag each coordinate of `self - prev` and interleave them into one integer.
    fn weave_delta(self, prev: Self) -> OvtResult<u64>;

    /// Inverse of [`Vertex::weave_delta`].
    fn unweave_delta(woven: u64, prev: Self) -> Self;

    /// Build points from a flat coordinate array, `DIMENSIONS` values per point.
    fn from_flat(coords: &[i32]) -> OvtResult<Vec<Self>>;
}

impl Vertex for Point {
    const DIMENSIONS: usize = 2;

    #[inline]
    fn weave_delta(self, prev: Self) -> OvtResult<u64> {
        Ok(weave_2d(
            zigzag_encode_i32(self.x.wrapping_sub(prev.x)),
            zigzag_encode_i32(self.y.wrapping_sub(prev.y)),
        ))
    }

    #[inline]
    fn unweave_delta(woven: u64, prev: Self) -> Self {
        let (dx, dy) = unweave_2d(woven);
        Self::new(
            prev.x.wrapping_add(zigzag_decode_i32(dx)),
            prev.y.wrapping_add(zigzag_decode_i32(dy)),
        )
    }

    fn from_flat(coords: &[i32]) -> OvtResult<Vec<Self>> {
        if coords.len() % 2 != 0 {
            ovt_bail!(MalformedTessellation: coords.len())
        }
        Ok(coords
            .chunks_exact(2)
            .map(|c| Self::new(c[0], c[1]))
            .collect())
    }
}

impl Vertex for Point3D {
    const DIMENSIONS: usize = 3;

    fn weave_delta(self, prev: Self) -> OvtResult<u64> {
        let dx = zigzag_encode_i32(self.x.wrapping_sub(prev.x));
        let dy = zigzag_encode_i32(self.y.wrapping_sub(prev.y));
        let dz = zigzag_encode_i32(self.z.wrapping_sub(prev.z));
        if dx.max(dy).max(dz) > WEAVE_3D_MAX {
            ovt_bail!(
                "3D point {} is too far from {} to weave into 21 bits per axis",
                self,
                prev
            )
        }
        Ok(weave_3d(dx, dy, dz))
    }

    fn unweave_delta(woven: u64, prev: Self) -> Self {
        let (dx, dy, dz) = unweave_3d(woven);
        Self::new(
            prev.x.wrapping_add(zigzag_decode_i32(dx)),
            prev.y.wrapping_add(zigzag_decode_i32(dy)),
            prev.z.wrapping_add(zigzag_decode_i32(dz)),
        )
    }

    fn from_flat(coords: &[i32]) -> OvtResult<Vec<Self>> {
        if coords.len() % 3 != 0 {
            ovt_bail!(MalformedTessellation: coords.len())
        }
        Ok(coords
            .chunks_exact(3)
            .map(|c| Self::new(c[0], c[1], c[2]))
            .collect())
    }
}

/// Delta, zigzag and weave a run of points into one integer per point.
pub fn encode_points<V: Vertex>(points: &[V]) -> OvtResult<Vec<u64>> {
    let mut prev = V::default();
    points
        .iter()
        .map(|&point| {
            let woven = point.weave_delta(prev)?;
            prev = point;
            Ok(woven)
        })
        .collect()
}

/// Inverse of [`encode_points`].
pub fn decode_points<V: Vertex>(woven: &[u64]) -> Vec<V> {
    let mut prev = V::default();
    woven
        .iter()
        .map(|&w| {
            prev = V::unweave_delta(w, prev);
            prev
        })
        .collect()
}

/// The inline form of a lone point: its coordinates zigzagged and woven, with no predecessor.
pub fn weave_single<V: Vertex>(point: V) -> OvtResult<u64> {
    point.weave_delta(V::default())
}

/// Inverse of [`weave_single`].
pub fn unweave_single<V: Vertex>(woven: u64) -> V {
    V::unweave_delta(woven, V::default())
}
