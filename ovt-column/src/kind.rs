use std::fmt::{Display, Formatter};

use ovt_error::{OvtError, OvtResult, ovt_bail};
use ovt_wire::WireType;

/// The ten columns of the cache. The discriminant is the wire field number of the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ColumnKind {
    String = 0,
    Unsigned = 1,
    Signed = 2,
    Float = 3,
    Double = 4,
    Points = 5,
    Points3D = 6,
    Indices = 7,
    Shapes = 8,
    BBox = 9,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 10] = [
        ColumnKind::String,
        ColumnKind::Unsigned,
        ColumnKind::Signed,
        ColumnKind::Float,
        ColumnKind::Double,
        ColumnKind::Points,
        ColumnKind::Points3D,
        ColumnKind::Indices,
        ColumnKind::Shapes,
        ColumnKind::BBox,
    ];

    /// The wire field number the column is written under.
    pub fn field(self) -> u32 {
        self as u32
    }

    /// How one value of this column is framed on the wire.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Unsigned | Self::Signed => WireType::Varint,
            Self::Float => WireType::Fixed32,
            Self::Double => WireType::Fixed64,
            Self::String
            | Self::Points
            | Self::Points3D
            | Self::Indices
            | Self::Shapes
            | Self::BBox => WireType::LengthDelimited,
        }
    }

    /// Whether indices into this column are only assigned when the cache is written.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Unsigned | Self::Signed | Self::Float | Self::Double
        )
    }
}

impl TryFrom<u32> for ColumnKind {
    type Error = OvtError;

    fn try_from(value: u32) -> OvtResult<Self> {
        match ColumnKind::ALL.get(value as usize) {
            Some(kind) => Ok(*kind),
            None => ovt_bail!(UnknownColumnKind: u64::from(value)),
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Unsigned => "unsigned",
            Self::Signed => "signed",
            Self::Float => "float",
            Self::Double => "double",
            Self::Points => "points",
            Self::Points3D => "points3D",
            Self::Indices => "indices",
            Self::Shapes => "shapes",
            Self::BBox => "bbox",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use ovt_error::OvtError;

    use super::*;

    #[test]
    fn kinds_match_field_numbers() {
        for (field, kind) in ColumnKind::ALL.iter().enumerate() {
            assert_eq!(kind.field() as usize, field);
            assert_eq!(ColumnKind::try_from(field as u32).unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_kind() {
        assert!(matches!(
            ColumnKind::try_from(10),
            Err(OvtError::UnknownColumnKind(10, _))
        ));
    }
}
