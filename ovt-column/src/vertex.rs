use ovt_error::OvtResult;
use ovt_geometry::{Point, Point3D, Vertex};

use crate::{ColumnCacheReader, ColumnCacheWriter, ColumnKind};

/// A [`Vertex`] type with a points column of its own.
pub trait VertexColumn: Vertex {
    const COLUMN: ColumnKind;

    fn add_to(cache: &mut ColumnCacheWriter, points: &[Self]) -> OvtResult<u64>;

    fn get_from(cache: &ColumnCacheReader, index: u64) -> OvtResult<&[Self]>;
}

impl VertexColumn for Point {
    const COLUMN: ColumnKind = ColumnKind::Points;

    fn add_to(cache: &mut ColumnCacheWriter, points: &[Self]) -> OvtResult<u64> {
        cache.add_points(points)
    }

    fn get_from(cache: &ColumnCacheReader, index: u64) -> OvtResult<&[Self]> {
        cache.get_points(index)
    }
}

impl VertexColumn for Point3D {
    const COLUMN: ColumnKind = ColumnKind::Points3D;

    fn add_to(cache: &mut ColumnCacheWriter, points: &[Self]) -> OvtResult<u64> {
        cache.add_points_3d(points)
    }

    fn get_from(cache: &ColumnCacheReader, index: u64) -> OvtResult<&[Self]> {
        cache.get_points_3d(index)
    }
}
