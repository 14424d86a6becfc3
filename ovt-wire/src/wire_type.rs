use std::fmt::{Display, Formatter};

use ovt_error::{OvtError, OvtResult, ovt_bail};

/// The encoding of a field's payload, stored in the low three bits of its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// A base-128 varint.
    Varint = 0,
    /// Eight little-endian bytes.
    Fixed64 = 1,
    /// A varint length followed by that many bytes.
    LengthDelimited = 2,
    /// Four little-endian bytes.
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = OvtError;

    fn try_from(value: u8) -> OvtResult<Self> {
        Ok(match value {
            0 => Self::Varint,
            1 => Self::Fixed64,
            2 => Self::LengthDelimited,
            5 => Self::Fixed32,
            other => ovt_bail!(UnsupportedWireType: other),
        })
    }
}

impl WireType {
    /// Check that a field was framed the way its reader expects.
    pub fn ensure(self, expected: WireType) -> OvtResult<()> {
        if self != expected {
            ovt_bail!(MismatchedTypes: expected, self)
        }
        Ok(())
    }
}

impl Display for WireType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Varint => write!(f, "varint"),
            Self::Fixed64 => write!(f, "fixed64"),
            Self::LengthDelimited => write!(f, "bytes"),
            Self::Fixed32 => write!(f, "fixed32"),
        }
    }
}

/// Combine a field number and wire type into the varint tag that precedes every field.
#[inline]
pub fn make_tag(field: u32, wire_type: WireType) -> u64 {
    (u64::from(field) << 3) | wire_type as u64
}
