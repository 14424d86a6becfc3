use std::cell::{OnceCell, RefCell};

use bytes::Bytes;
use ovt_error::{OvtResult, ovt_bail, ovt_err};
use ovt_geometry::{BoundingBox, Point, Point3D, decode_points};
use ovt_wire::WireReader;
use ovt_zigzag::zigzag_delta_decode;

use crate::ColumnKind;

/// A column value whose bytes have been located but maybe not decoded yet.
struct Slot<T> {
    offset: usize,
    value: OnceCell<T>,
}

struct Column<T> {
    kind: ColumnKind,
    slots: Vec<Slot<T>>,
}

impl<T> Column<T> {
    fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    fn get(
        &self,
        index: u64,
        cursor: &RefCell<WireReader>,
        decode: impl FnOnce(&mut WireReader) -> OvtResult<T>,
    ) -> OvtResult<&T> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .ok_or_else(|| {
                ovt_err!(OutOfBounds: usize::try_from(index).unwrap_or(usize::MAX), 0, self.slots.len())
            })?;
        if let Some(value) = slot.value.get() {
            return Ok(value);
        }
        log::trace!("Decoding {} column value {} at byte {}", self.kind, index, slot.offset);
        let value = cursor.borrow_mut().peek_at(slot.offset, decode)?;
        Ok(slot.value.get_or_init(|| value))
    }
}

/// A borrowed value from any column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnData<'a> {
    String(&'a str),
    Unsigned(u64),
    Signed(i64),
    Float(f32),
    Double(f64),
    Points(&'a [Point]),
    Points3D(&'a [Point3D]),
    Indices(&'a [u64]),
    Shapes(&'a [u64]),
    BBox(BoundingBox),
}

/// Read side of the column cache.
///
/// Construction scans the cache message once and records where each value starts. A value is
/// decoded the first time it is requested and kept for later requests. All columns share one
/// cursor, which is put back after every out-of-order read.
pub struct ColumnCacheReader {
    cursor: RefCell<WireReader>,
    strings: Column<String>,
    unsigned: Column<u64>,
    signed: Column<i64>,
    floats: Column<f32>,
    doubles: Column<f64>,
    points: Column<Vec<Point>>,
    points_3d: Column<Vec<Point3D>>,
    indices: Column<Vec<u64>>,
    shapes: Column<Vec<u64>>,
    bboxes: Column<BoundingBox>,
}

impl ColumnCacheReader {
    /// Index the body of a column cache message.
    pub fn new(bytes: impl Into<Bytes>) -> OvtResult<Self> {
        let mut cache = Self::empty();
        let mut reader = WireReader::new(bytes);
        let end = reader.len();
        reader.read_fields(end, |field, wire_type, r| {
            let kind = ColumnKind::try_from(field)?;
            if wire_type != kind.wire_type() {
                ovt_bail!(
                    InvalidSerde: "{} column value framed as {}, expected {}",
                    kind,
                    wire_type,
                    kind.wire_type()
                )
            }
            cache.push_slot(kind, r.position());
            Ok(())
        })?;
        log::debug!(
            "Indexed column cache of {} bytes: {}",
            end,
            ColumnKind::ALL
                .iter()
                .map(|&kind| format!("{kind}={}", cache.len(kind)))
                .collect::<Vec<_>>()
                .join(" ")
        );
        cache.cursor = RefCell::new(reader);
        Ok(cache)
    }

    /// A cache with no values, for tiles that carry no cache message.
    pub fn empty() -> Self {
        Self {
            cursor: RefCell::new(WireReader::new(Bytes::new())),
            strings: Column::new(ColumnKind::String),
            unsigned: Column::new(ColumnKind::Unsigned),
            signed: Column::new(ColumnKind::Signed),
            floats: Column::new(ColumnKind::Float),
            doubles: Column::new(ColumnKind::Double),
            points: Column::new(ColumnKind::Points),
            points_3d: Column::new(ColumnKind::Points3D),
            indices: Column::new(ColumnKind::Indices),
            shapes: Column::new(ColumnKind::Shapes),
            bboxes: Column::new(ColumnKind::BBox),
        }
    }

    fn push_slot(&mut self, kind: ColumnKind, offset: usize) {
        macro_rules! push {
            ($column:expr) => {
                $column.slots.push(Slot {
                    offset,
                    value: OnceCell::new(),
                })
            };
        }
        match kind {
            ColumnKind::String => push!(self.strings),
            ColumnKind::Unsigned => push!(self.unsigned),
            ColumnKind::Signed => push!(self.signed),
            ColumnKind::Float => push!(self.floats),
            ColumnKind::Double => push!(self.doubles),
            ColumnKind::Points => push!(self.points),
            ColumnKind::Points3D => push!(self.points_3d),
            ColumnKind::Indices => push!(self.indices),
            ColumnKind::Shapes => push!(self.shapes),
            ColumnKind::BBox => push!(self.bboxes),
        }
    }

    /// Number of values stored in a column.
    pub fn len(&self, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::String => self.strings.slots.len(),
            ColumnKind::Unsigned => self.unsigned.slots.len(),
            ColumnKind::Signed => self.signed.slots.len(),
            ColumnKind::Float => self.floats.slots.len(),
            ColumnKind::Double => self.doubles.slots.len(),
            ColumnKind::Points => self.points.slots.len(),
            ColumnKind::Points3D => self.points_3d.slots.len(),
            ColumnKind::Indices => self.indices.slots.len(),
            ColumnKind::Shapes => self.shapes.slots.len(),
            ColumnKind::BBox => self.bboxes.slots.len(),
        }
    }

    pub fn get_string(&self, index: u64) -> OvtResult<&str> {
        self.strings
            .get(index, &self.cursor, |r| r.read_string())
            .map(String::as_str)
    }

    pub fn get_unsigned(&self, index: u64) -> OvtResult<u64> {
        self.unsigned
            .get(index, &self.cursor, |r| r.read_varint())
            .copied()
    }

    pub fn get_signed(&self, index: u64) -> OvtResult<i64> {
        self.signed
            .get(index, &self.cursor, |r| r.read_svarint())
            .copied()
    }

    pub fn get_float(&self, index: u64) -> OvtResult<f32> {
        self.floats
            .get(index, &self.cursor, |r| r.read_float())
            .copied()
    }

    pub fn get_double(&self, index: u64) -> OvtResult<f64> {
        self.doubles
            .get(index, &self.cursor, |r| r.read_double())
            .copied()
    }

    pub fn get_points(&self, index: u64) -> OvtResult<&[Point]> {
        self.points
            .get(index, &self.cursor, |r| {
                Ok(decode_points(&r.read_packed_varints()?))
            })
            .map(Vec::as_slice)
    }

    pub fn get_points_3d(&self, index: u64) -> OvtResult<&[Point3D]> {
        self.points_3d
            .get(index, &self.cursor, |r| {
                Ok(decode_points(&r.read_packed_varints()?))
            })
            .map(Vec::as_slice)
    }

    pub fn get_indices(&self, index: u64) -> OvtResult<&[u64]> {
        self.indices
            .get(index, &self.cursor, |r| {
                Ok(zigzag_delta_decode(&r.read_packed_varints()?))
            })
            .map(Vec::as_slice)
    }

    pub fn get_shapes(&self, index: u64) -> OvtResult<&[u64]> {
        self.shapes
            .get(index, &self.cursor, |r| {
                Ok(zigzag_delta_decode(&r.read_packed_varints()?))
            })
            .map(Vec::as_slice)
    }

    pub fn get_bbox(&self, index: u64) -> OvtResult<BoundingBox> {
        self.bboxes
            .get(index, &self.cursor, |r| {
                BoundingBox::dequantize(&r.read_bytes()?)
            })
            .copied()
    }

    /// Fetch a value from any column.
    pub fn get_column(&self, kind: ColumnKind, index: u64) -> OvtResult<ColumnData<'_>> {
        Ok(match kind {
            ColumnKind::String => ColumnData::String(self.get_string(index)?),
            ColumnKind::Unsigned => ColumnData::Unsigned(self.get_unsigned(index)?),
            ColumnKind::Signed => ColumnData::Signed(self.get_signed(index)?),
            ColumnKind::Float => ColumnData::Float(self.get_float(index)?),
            ColumnKind::Double => ColumnData::Double(self.get_double(index)?),
            ColumnKind::Points => ColumnData::Points(self.get_points(index)?),
            ColumnKind::Points3D => ColumnData::Points3D(self.get_points_3d(index)?),
            ColumnKind::Indices => ColumnData::Indices(self.get_indices(index)?),
            ColumnKind::Shapes => ColumnData::Shapes(self.get_shapes(index)?),
            ColumnKind::BBox => ColumnData::BBox(self.get_bbox(index)?),
        })
    }
}
