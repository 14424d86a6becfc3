use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use ovt_error::{OvtError, OvtResult, ovt_bail};

use crate::{Properties, Value};

/// Name of a field in a [`Shape`].
pub type FieldName = Arc<str>;

/// The leaf types of a shape. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PrimitiveShape {
    String = 0,
    U64 = 1,
    I64 = 2,
    F32 = 3,
    F64 = 4,
    Bool = 5,
    Null = 6,
}

impl PrimitiveShape {
    fn is_integer(self) -> bool {
        matches!(self, Self::U64 | Self::I64)
    }

    fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// The type both inputs can be stored as, or `None` if they do not combine.
    fn widen(self, other: Self) -> Option<Self> {
        use PrimitiveShape::*;

        Some(match (self, other) {
            (a, b) if a == b => a,
            (Null, x) | (x, Null) => x,
            (U64, I64) | (I64, U64) => I64,
            (a, b) if a.is_float() && (b.is_float() || b.is_integer()) => F64,
            (a, b) if b.is_float() && a.is_integer() => F64,
            (String, _) | (_, String) => String,
            _ => return None,
        })
    }
}

impl TryFrom<u64> for PrimitiveShape {
    type Error = OvtError;

    fn try_from(value: u64) -> OvtResult<Self> {
        Ok(match value {
            0 => Self::String,
            1 => Self::U64,
            2 => Self::I64,
            3 => Self::F32,
            4 => Self::F64,
            5 => Self::Bool,
            6 => Self::Null,
            other => ovt_bail!(InvalidSerde: "unknown primitive shape code {}", other),
        })
    }
}

impl Display for PrimitiveShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Null => "null",
        };
        write!(f, "{name}")
    }
}

/// The type of one field of a [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeType {
    Primitive(PrimitiveShape),
    /// A homogeneous array of the element type.
    Array(Box<ShapeType>),
    Object(Shape),
}

impl From<PrimitiveShape> for ShapeType {
    fn from(value: PrimitiveShape) -> Self {
        Self::Primitive(value)
    }
}

impl From<Shape> for ShapeType {
    fn from(value: Shape) -> Self {
        Self::Object(value)
    }
}

impl ShapeType {
    pub fn array(element: impl Into<ShapeType>) -> Self {
        Self::Array(Box::new(element.into()))
    }

    /// The shape a single value would be stored with.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => PrimitiveShape::Null.into(),
            Value::Bool(_) => PrimitiveShape::Bool.into(),
            Value::String(_) => PrimitiveShape::String.into(),
            Value::U64(_) => PrimitiveShape::U64.into(),
            Value::I64(_) => PrimitiveShape::I64.into(),
            Value::F32(_) => PrimitiveShape::F32.into(),
            Value::F64(_) => PrimitiveShape::F64.into(),
            Value::Array(values) => Self::array(
                values
                    .iter()
                    .map(Self::of)
                    .reduce(|acc, next| acc.merge(&next))
                    .unwrap_or_else(|| PrimitiveShape::Null.into()),
            ),
            Value::Object(props) => Shape::of(props).into(),
        }
    }

    /// Combine two field types seen for the same key.
    ///
    /// Null gives way to anything, integers and floats widen, strings absorb booleans and numbers,
    /// and arrays and objects merge element-wise. Any other conflict keeps `self`.
    pub fn merge(&self, other: &ShapeType) -> ShapeType {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => {
                a.widen(*b).map_or_else(|| self.clone(), Self::Primitive)
            }
            (Self::Primitive(PrimitiveShape::Null), _) => other.clone(),
            (Self::Array(a), Self::Array(b)) => Self::Array(Box::new(a.merge(b))),
            (Self::Object(a), Self::Object(b)) => {
                let mut merged = a.clone();
                merged.merge(b);
                Self::Object(merged)
            }
            _ => self.clone(),
        }
    }
}

impl Display for ShapeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Object(shape) => write!(f, "{shape}"),
        }
    }
}

/// The schema of a properties object: an ordered list of uniquely named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    fields: Vec<(FieldName, ShapeType)>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing the type of an existing field with the same name.
    pub fn with_field(mut self, name: impl Into<FieldName>, ty: impl Into<ShapeType>) -> Self {
        self.insert(name, ty);
        self
    }

    pub fn insert(&mut self, name: impl Into<FieldName>, ty: impl Into<ShapeType>) {
        let name = name.into();
        let ty = ty.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = ty,
            None => self.fields.push((name, ty)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShapeType> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, ty)| ty)
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&FieldName, &ShapeType)> {
        self.fields.iter().map(|(n, ty)| (n, ty))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The shape of one properties object.
    pub fn of(props: &Properties) -> Self {
        Self {
            fields: props
                .iter()
                .map(|(k, v)| (FieldName::from(k.as_str()), ShapeType::of(v)))
                .collect(),
        }
    }

    /// Infer one shape covering every properties object, in order of first appearance.
    pub fn infer<'a>(props: impl IntoIterator<Item = &'a Properties>) -> Self {
        let mut shape = Shape::new();
        for p in props {
            shape.merge(&Shape::of(p));
        }
        shape
    }

    /// Fold `other` into `self`: new keys are appended, shared keys are merged.
    pub fn merge(&mut self, other: &Shape) {
        for (name, ty) in &other.fields {
            match self.fields.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing = existing.merge(ty),
                None => self.fields.push((name.clone(), ty.clone())),
            }
        }
    }
}

impl<N: Into<FieldName>> FromIterator<(N, ShapeType)> for Shape {
    fn from_iter<T: IntoIterator<Item = (N, ShapeType)>>(iter: T) -> Self {
        let mut shape = Shape::new();
        for (name, ty) in iter {
            shape.insert(name, ty);
        }
        shape
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.fields
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}"))
                .join(", ")
        )
    }
}
