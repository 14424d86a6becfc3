use std::fmt::{Display, Formatter};

use bitflags::bitflags;
use ovt_error::{OvtError, OvtResult, ovt_bail};

/// The geometry class of a feature. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FeatureType {
    Points = 1,
    Lines = 2,
    Polygons = 3,
    Points3D = 4,
    Lines3D = 5,
    Polygons3D = 6,
}

impl FeatureType {
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn is_3d(self) -> bool {
        matches!(self, Self::Points3D | Self::Lines3D | Self::Polygons3D)
    }

    pub fn is_polygons(self) -> bool {
        matches!(self, Self::Polygons | Self::Polygons3D)
    }
}

impl TryFrom<u64> for FeatureType {
    type Error = OvtError;

    fn try_from(value: u64) -> OvtResult<Self> {
        Ok(match value {
            1 => Self::Points,
            2 => Self::Lines,
            3 => Self::Polygons,
            4 => Self::Points3D,
            5 => Self::Lines3D,
            6 => Self::Polygons3D,
            other => ovt_bail!(UnknownFeatureType: other),
        })
    }
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Polygons => "polygons",
            Self::Points3D => "points3D",
            Self::Lines3D => "lines3D",
            Self::Polygons3D => "polygons3D",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// The flag byte following a feature's type.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub(crate) struct FeatureFlags: u8 {
        const ID = 1;
        const BBOX = 1 << 1;
        const OFFSETS = 1 << 2;
        const INDICES = 1 << 3;
        const TESSELLATION = 1 << 4;
        const M_VALUES = 1 << 5;
        const SINGLE = 1 << 6;
    }
}
