use std::hash::Hash;

use num_traits::ToPrimitive;
use ovt_error::{OvtExpect, OvtResult, ovt_bail, ovt_err};
use ovt_geometry::{BoundingBox, Point, Point3D, encode_points};
use ovt_wire::WireWriter;
use ovt_zigzag::zigzag_delta_encode;
use rustc_hash::FxBuildHasher;

use crate::{ColumnKind, ColumnValue, NumberRef, NumericColumn, NumericValue};

pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V, FxBuildHasher>;
pub(crate) use std::collections::hash_map::Entry;

/// Deduplicated entries of a non-numeric column. Indices are final on insertion.
struct DedupColumn<K> {
    lookup: HashMap<K, u32>,
    entries: Vec<K>,
    counts: Vec<u32>,
}

impl<K> Default for DedupColumn<K> {
    fn default() -> Self {
        Self {
            lookup: HashMap::with_hasher(FxBuildHasher),
            entries: Vec::new(),
            counts: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> DedupColumn<K> {
    fn add(&mut self, key: K) -> u64 {
        let index = match self.lookup.entry(key) {
            Entry::Occupied(o) => {
                let index = *o.get();
                self.counts[index as usize] += 1;
                index
            }
            Entry::Vacant(vac) => {
                let index = u32::try_from(self.entries.len())
                    .ok()
                    .ovt_expect("column exceeds u32::MAX entries");
                self.entries.push(vac.key().clone());
                vac.insert(index);
                self.counts.push(1);
                index
            }
        };
        u64::from(index)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn reference_count(&self, index: u64) -> u32 {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.counts.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// Final indices of every numeric insertion slot, computed when the cache is written.
struct NumberIndices {
    unsigned: Vec<u64>,
    signed: Vec<u64>,
    floats: Vec<u64>,
    doubles: Vec<u64>,
}

impl NumberIndices {
    fn resolve(&self, value: ColumnValue) -> OvtResult<u64> {
        let number = match value {
            ColumnValue::Index(index) => return Ok(index),
            ColumnValue::Number(number) => number,
        };
        let remap = match number.kind {
            ColumnKind::Unsigned => &self.unsigned,
            ColumnKind::Signed => &self.signed,
            ColumnKind::Float => &self.floats,
            ColumnKind::Double => &self.doubles,
            other => ovt_bail!(MismatchedTypes: "numeric column", other),
        };
        remap
            .get(number.slot as usize)
            .copied()
            .ok_or_else(|| ovt_err!(OutOfBounds: number.slot as usize, 0, remap.len()))
    }

    fn resolve_all(&self, values: &[ColumnValue]) -> OvtResult<Vec<u64>> {
        values.iter().map(|&v| self.resolve(v)).collect()
    }
}

/// Collects every value referenced by the features of a tile.
///
/// Adding a value that is already present returns the existing reference and bumps its
/// reference count. Nothing is serialized until [`ColumnCacheWriter::write`], which consumes the
/// cache: numeric indices only become final there.
#[derive(Default)]
pub struct ColumnCacheWriter {
    strings: DedupColumn<String>,
    unsigned: NumericColumn<u64>,
    signed: NumericColumn<i64>,
    floats: NumericColumn<f32>,
    doubles: NumericColumn<f64>,
    points: DedupColumn<Vec<u64>>,
    points_3d: DedupColumn<Vec<u64>>,
    indices: DedupColumn<Vec<ColumnValue>>,
    shapes: DedupColumn<Vec<ColumnValue>>,
    bboxes: DedupColumn<Vec<u8>>,
}

impl ColumnCacheWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_string(&mut self, value: &str) -> u64 {
        self.strings.add(value.to_string())
    }

    pub fn add_unsigned(&mut self, value: u64) -> NumberRef {
        self.unsigned.add(value)
    }

    pub fn add_signed(&mut self, value: i64) -> NumberRef {
        self.signed.add(value)
    }

    pub fn add_float(&mut self, value: f32) -> NumberRef {
        self.floats.add(value)
    }

    pub fn add_double(&mut self, value: f64) -> NumberRef {
        self.doubles.add(value)
    }

    /// Store a number in the narrowest column that holds it exactly.
    ///
    /// Non-negative integers go to the unsigned column, negative integers to the signed column
    /// and anything else to the double column.
    pub fn add_number(&mut self, value: f64) -> ColumnValue {
        let number = if value.fract() == 0.0 {
            if let Some(unsigned) = value.to_u64() {
                self.add_unsigned(unsigned)
            } else if let Some(signed) = value.to_i64() {
                self.add_signed(signed)
            } else {
                self.add_double(value)
            }
        } else {
            self.add_double(value)
        };
        ColumnValue::Number(number)
    }

    pub fn add_points(&mut self, points: &[Point]) -> OvtResult<u64> {
        Ok(self.points.add(encode_points(points)?))
    }

    pub fn add_points_3d(&mut self, points: &[Point3D]) -> OvtResult<u64> {
        Ok(self.points_3d.add(encode_points(points)?))
    }

    pub fn add_indices(&mut self, values: Vec<ColumnValue>) -> u64 {
        self.indices.add(values)
    }

    /// Store one encoded shape value, or a shape definition.
    pub fn add_shapes(&mut self, values: Vec<ColumnValue>) -> u64 {
        self.shapes.add(values)
    }

    pub fn add_bbox(&mut self, bbox: &BoundingBox) -> u64 {
        self.bboxes.add(bbox.quantize())
    }

    /// Number of distinct values stored in a column.
    pub fn len(&self, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::String => self.strings.len(),
            ColumnKind::Unsigned => self.unsigned.len(),
            ColumnKind::Signed => self.signed.len(),
            ColumnKind::Float => self.floats.len(),
            ColumnKind::Double => self.doubles.len(),
            ColumnKind::Points => self.points.len(),
            ColumnKind::Points3D => self.points_3d.len(),
            ColumnKind::Indices => self.indices.len(),
            ColumnKind::Shapes => self.shapes.len(),
            ColumnKind::BBox => self.bboxes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        ColumnKind::ALL.iter().all(|&kind| self.len(kind) == 0)
    }

    /// How many times a value was added. Numeric columns are addressed by insertion slot.
    pub fn reference_count(&self, kind: ColumnKind, index: u64) -> u32 {
        let slot = u32::try_from(index).unwrap_or(u32::MAX);
        match kind {
            ColumnKind::String => self.strings.reference_count(index),
            ColumnKind::Unsigned => self.unsigned.reference_count(slot),
            ColumnKind::Signed => self.signed.reference_count(slot),
            ColumnKind::Float => self.floats.reference_count(slot),
            ColumnKind::Double => self.doubles.reference_count(slot),
            ColumnKind::Points => self.points.reference_count(index),
            ColumnKind::Points3D => self.points_3d.reference_count(index),
            ColumnKind::Indices => self.indices.reference_count(index),
            ColumnKind::Shapes => self.shapes.reference_count(index),
            ColumnKind::BBox => self.bboxes.reference_count(index),
        }
    }

    /// Serialize every column in kind order as the fields of the cache message.
    ///
    /// Numeric columns are sorted by descending reference count, then ascending value, and every
    /// [`NumberRef`] held by an index list or shape value is rewritten to its final index.
    pub fn write(self, writer: &mut WireWriter) -> OvtResult<()> {
        log::debug!(
            "Writing column cache: {}",
            ColumnKind::ALL
                .iter()
                .map(|&kind| format!("{kind}={}", self.len(kind)))
                .collect::<Vec<_>>()
                .join(" ")
        );

        for value in &self.strings.entries {
            writer.write_string_field(ColumnKind::String.field(), value);
        }

        let (unsigned, unsigned_remap) = self.unsigned.sorted();
        let (signed, signed_remap) = self.signed.sorted();
        let (floats, floats_remap) = self.floats.sorted();
        let (doubles, doubles_remap) = self.doubles.sorted();
        unsigned.into_iter().for_each(|v| v.write(writer));
        signed.into_iter().for_each(|v| v.write(writer));
        floats.into_iter().for_each(|v| v.write(writer));
        doubles.into_iter().for_each(|v| v.write(writer));
        let numbers = NumberIndices {
            unsigned: unsigned_remap,
            signed: signed_remap,
            floats: floats_remap,
            doubles: doubles_remap,
        };

        for woven in &self.points.entries {
            writer.write_packed_varints(ColumnKind::Points.field(), woven);
        }
        for woven in &self.points_3d.entries {
            writer.write_packed_varints(ColumnKind::Points3D.field(), woven);
        }
        for values in &self.indices.entries {
            let resolved = numbers.resolve_all(values)?;
            writer.write_packed_varints(ColumnKind::Indices.field(), &zigzag_delta_encode(&resolved));
        }
        for values in &self.shapes.entries {
            let resolved = numbers.resolve_all(values)?;
            writer.write_packed_varints(ColumnKind::Shapes.field(), &zigzag_delta_encode(&resolved));
        }
        for bbox in &self.bboxes.entries {
            writer.write_bytes_field(ColumnKind::BBox.field(), bbox);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ovt_wire::{WireReader, WireType};

    use super::*;

    #[test]
    fn repeated_inserts_share_one_entry() {
        let mut cache = ColumnCacheWriter::new();
        let refs = (0..4).map(|_| cache.add_signed(-7)).collect::<Vec<_>>();
        assert!(refs.iter().all(|r| *r == refs[0]));
        assert_eq!(cache.len(ColumnKind::Signed), 1);
        assert_eq!(cache.reference_count(ColumnKind::Signed, u64::from(refs[0].slot)), 4);

        assert_eq!(cache.add_string("a"), 0);
        assert_eq!(cache.add_string("b"), 1);
        assert_eq!(cache.add_string("a"), 0);
        assert_eq!(cache.reference_count(ColumnKind::String, 0), 2);
    }

    #[test]
    fn add_number_routes_by_value() {
        let mut cache = ColumnCacheWriter::new();
        let kind = |v: ColumnValue| match v {
            ColumnValue::Number(n) => n.kind,
            ColumnValue::Index(_) => unreachable!(),
        };
        assert_eq!(kind(cache.add_number(3.0)), ColumnKind::Unsigned);
        assert_eq!(kind(cache.add_number(-3.0)), ColumnKind::Signed);
        assert_eq!(kind(cache.add_number(2.5)), ColumnKind::Double);
        assert_eq!(kind(cache.add_number(f64::NAN)), ColumnKind::Double);
        assert_eq!(kind(cache.add_number(1e300)), ColumnKind::Double);
    }

    #[test]
    fn hot_numbers_get_low_indices() {
        let mut cache = ColumnCacheWriter::new();
        let one = cache.add_unsigned(1);
        let two = cache.add_unsigned(2);
        cache.add_unsigned(2);
        let three = cache.add_unsigned(3);
        cache.add_indices(vec![one.into(), two.into(), three.into(), ColumnValue::Index(9)]);

        let mut writer = WireWriter::new();
        cache.write(&mut writer).unwrap();
        let mut reader = WireReader::new(writer.finish());

        let mut unsigned = vec![];
        while reader.has_remaining() {
            let (field, wire_type) = reader.read_tag().unwrap();
            match ColumnKind::try_from(field).unwrap() {
                ColumnKind::Unsigned => unsigned.push(reader.read_varint().unwrap()),
                ColumnKind::Indices => {
                    let packed = reader.read_packed_varints().unwrap();
                    // final indices 1, 0, 2 and the plain 9
                    assert_eq!(ovt_zigzag::zigzag_delta_decode(&packed), vec![1, 0, 2, 9]);
                }
                _ => reader.skip(wire_type).unwrap(),
            }
        }
        assert_eq!(unsigned, vec![2, 1, 3]);
        assert_eq!(reader.last_wire_type(), WireType::LengthDelimited);
    }

    #[test]
    fn empty_cache_writes_nothing() {
        let cache = ColumnCacheWriter::new();
        assert!(cache.is_empty());
        let mut writer = WireWriter::new();
        cache.write(&mut writer).unwrap();
        assert!(writer.is_empty());
    }
}
