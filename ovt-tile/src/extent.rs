use std::fmt::{Display, Formatter};

use ovt_error::{OvtError, OvtResult, ovt_bail};

/// Side length of a layer's coordinate space. Only six extents are legal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extent {
    E512,
    E1024,
    E2048,
    #[default]
    E4096,
    E8192,
    E16384,
}

impl Extent {
    pub const ALL: [Extent; 6] = [
        Extent::E512,
        Extent::E1024,
        Extent::E2048,
        Extent::E4096,
        Extent::E8192,
        Extent::E16384,
    ];

    pub fn value(self) -> u64 {
        512 << self.code()
    }

    /// The three-bit code the extent is stored as.
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> OvtResult<Self> {
        match usize::try_from(code).ok().and_then(|c| Self::ALL.get(c)) {
            Some(extent) => Ok(*extent),
            None => ovt_bail!(InvalidExtent: code),
        }
    }
}

impl TryFrom<u64> for Extent {
    type Error = OvtError;

    /// Convert a raw extent such as `4096`.
    fn try_from(value: u64) -> OvtResult<Self> {
        match Self::ALL.iter().find(|e| e.value() == value) {
            Some(extent) => Ok(*extent),
            None => ovt_bail!(InvalidExtent: value),
        }
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}
