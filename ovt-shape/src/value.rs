use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The properties of a feature, or the M-values of a vertex.
pub type Properties = BTreeMap<String, Value>;

/// A property value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    String(String),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Array(Vec<Value>),
    Object(Properties),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Properties> {
        match self {
            Self::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Unsigned view of the value. Signed integers wrap and floats saturate.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            Self::I64(v) => Some(*v as u64),
            Self::F32(v) => Some(*v as u64),
            Self::F64(v) => Some(*v as u64),
            Self::Bool(v) => Some(u64::from(*v)),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Signed view of the value. Unsigned integers wrap and floats saturate.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::U64(v) => Some(*v as i64),
            Self::I64(v) => Some(*v),
            Self::F32(v) => Some(*v as i64),
            Self::F64(v) => Some(*v as i64),
            Self::Bool(v) => Some(i64::from(*v)),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::U64(v) => Some(*v as f64),
            Self::I64(v) => Some(*v as f64),
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            Self::String(s) => s.trim().parse().ok(),
            other => other.to_f64().map(|v| v as f32),
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::U64(v) => Some(*v != 0),
            Self::I64(v) => Some(*v != 0),
            Self::F32(v) => Some(*v != 0.0),
            Self::F64(v) => Some(*v != 0.0),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view of the value. Booleans and numbers use their display form.
    pub fn to_string_value(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Bool(v) => Some(v.to_string()),
            Self::U64(v) => Some(v.to_string()),
            Self::I64(v) => Some(v.to_string()),
            Self::F32(v) => Some(v.to_string()),
            Self::F64(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "\"{v}\""),
            Self::U64(v) => write!(f, "{v}u64"),
            Self::I64(v) => write!(f, "{v}i64"),
            Self::F32(v) => write!(f, "{v}f32"),
            Self::F64(v) => write!(f, "{v}f64"),
            Self::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Object(props) => {
                write!(f, "{{")?;
                for (i, (k, v)) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Properties> for Value {
    fn from(value: Properties) -> Self {
        Self::Object(value)
    }
}
