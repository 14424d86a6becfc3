use std::cmp::Ordering;
use std::hash::Hash;

use ovt_error::OvtExpect;
use ovt_wire::WireWriter;
use rustc_hash::FxBuildHasher;

use crate::ColumnKind;
use crate::writer::{Entry, HashMap};

/// A handle to a value in one of the numeric columns.
///
/// The final index of a numeric value depends on how often every value in its column is
/// referenced, so it only exists once the whole tile has been visited. Until then writers hold
/// the column and the insertion slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberRef {
    pub kind: ColumnKind,
    pub slot: u32,
}

/// One element of an index list or an encoded shape value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnValue {
    /// A plain integer: a count, a string index or any other index that is final on insertion.
    Index(u64),
    /// A reference into a numeric column, resolved when the cache is written.
    Number(NumberRef),
}

impl From<u64> for ColumnValue {
    fn from(value: u64) -> Self {
        Self::Index(value)
    }
}

impl From<NumberRef> for ColumnValue {
    fn from(value: NumberRef) -> Self {
        Self::Number(value)
    }
}

/// A value that can live in one of the four numeric columns.
pub trait NumericValue: Copy {
    const KIND: ColumnKind;

    /// Identity of the value for deduplication. Floats are compared by bit pattern.
    type Key: Hash + Eq;

    fn key(self) -> Self::Key;

    /// Ascending order used to break reference-count ties.
    fn order(&self, other: &Self) -> Ordering;

    fn write(self, writer: &mut WireWriter);
}

impl NumericValue for u64 {
    const KIND: ColumnKind = ColumnKind::Unsigned;
    type Key = u64;

    fn key(self) -> u64 {
        self
    }

    fn order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn write(self, writer: &mut WireWriter) {
        writer.write_varint_field(Self::KIND.field(), self);
    }
}

impl NumericValue for i64 {
    const KIND: ColumnKind = ColumnKind::Signed;
    type Key = i64;

    fn key(self) -> i64 {
        self
    }

    fn order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn write(self, writer: &mut WireWriter) {
        writer.write_svarint_field(Self::KIND.field(), self);
    }
}

impl NumericValue for f32 {
    const KIND: ColumnKind = ColumnKind::Float;
    type Key = u32;

    fn key(self) -> u32 {
        self.to_bits()
    }

    fn order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn write(self, writer: &mut WireWriter) {
        writer.write_float_field(Self::KIND.field(), self);
    }
}

impl NumericValue for f64 {
    const KIND: ColumnKind = ColumnKind::Double;
    type Key = u64;

    fn key(self) -> u64 {
        self.to_bits()
    }

    fn order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn write(self, writer: &mut WireWriter) {
        writer.write_double_field(Self::KIND.field(), self);
    }
}

/// Deduplicated values of one numeric column in insertion order, with their reference counts.
pub(crate) struct NumericColumn<T: NumericValue> {
    lookup: HashMap<T::Key, u32>,
    values: Vec<T>,
    counts: Vec<u32>,
}

impl<T: NumericValue> Default for NumericColumn<T> {
    fn default() -> Self {
        Self {
            lookup: HashMap::with_hasher(FxBuildHasher),
            values: Vec::new(),
            counts: Vec::new(),
        }
    }
}

impl<T: NumericValue> NumericColumn<T> {
    pub fn add(&mut self, value: T) -> NumberRef {
        let slot = match self.lookup.entry(value.key()) {
            Entry::Occupied(o) => {
                let slot = *o.get();
                self.counts[slot as usize] += 1;
                slot
            }
            Entry::Vacant(vac) => {
                let slot = u32::try_from(self.values.len())
                    .ok()
                    .ovt_expect("numeric column exceeds u32::MAX values");
                vac.insert(slot);
                self.values.push(value);
                self.counts.push(1);
                slot
            }
        };
        NumberRef {
            kind: T::KIND,
            slot,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn reference_count(&self, slot: u32) -> u32 {
        self.counts.get(slot as usize).copied().unwrap_or(0)
    }

    /// Order the column by descending reference count, then ascending value.
    ///
    /// Returns the values in final order and, for every insertion slot, its final index.
    pub fn sorted(&self) -> (Vec<T>, Vec<u64>) {
        let mut order = (0..self.values.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| {
            self.counts[b]
                .cmp(&self.counts[a])
                .then_with(|| self.values[a].order(&self.values[b]))
        });
        let mut remap = vec![0_u64; order.len()];
        for (index, &slot) in order.iter().enumerate() {
            remap[slot] = index as u64;
        }
        (order.iter().map(|&slot| self.values[slot]).collect(), remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_counts_references() {
        let mut column = NumericColumn::<u64>::default();
        let refs = (0..5).map(|_| column.add(42)).collect::<Vec<_>>();
        assert_eq!(column.len(), 1);
        assert!(refs.iter().all(|r| *r == refs[0]));
        assert_eq!(column.reference_count(refs[0].slot), 5);
    }

    #[test]
    fn sorted_by_count_then_value() {
        let mut column = NumericColumn::<u64>::default();
        for value in [3, 1, 2, 2] {
            column.add(value);
        }
        let (values, remap) = column.sorted();
        assert_eq!(values, vec![2, 1, 3]);
        // insertion slots were 3 -> 0, 1 -> 1, 2 -> 2
        assert_eq!(remap, vec![2, 1, 0]);
    }

    #[test]
    fn floats_sort_by_total_order() {
        let mut column = NumericColumn::<f64>::default();
        for value in [1.5, -0.0, 0.0, f64::NEG_INFINITY] {
            column.add(value);
        }
        assert_eq!(column.len(), 4);
        let (values, _) = column.sorted();
        assert_eq!(values[0], f64::NEG_INFINITY);
        assert!(values[1].is_sign_negative() && values[1] == 0.0);
        assert_eq!(values[3], 1.5);
    }
}
