use ovt_column::{ColumnCacheReader, ColumnCacheWriter, ColumnValue};
use ovt_error::{OvtResult, ovt_bail, ovt_err};

use crate::{PrimitiveShape, Properties, Shape, ShapeType, Value};

const CLASS_PRIMITIVE: u64 = 0;
const CLASS_ARRAY: u64 = 1;
const CLASS_OBJECT: u64 = 2;

/// Store a shape definition as a shapes-column entry and return its index.
///
/// Every type node is a header `(payload << 2) | class`. Primitives carry their code, arrays are
/// followed by their element node and objects carry their field count, each field being a key
/// string index followed by the field's node.
pub fn encode_shape(shape: &Shape, cache: &mut ColumnCacheWriter) -> u64 {
    let mut out = Vec::new();
    push_object_shape(shape, cache, &mut out);
    cache.add_shapes(out)
}

fn push_object_shape(shape: &Shape, cache: &mut ColumnCacheWriter, out: &mut Vec<ColumnValue>) {
    out.push(ColumnValue::Index(((shape.len() as u64) << 2) | CLASS_OBJECT));
    for (name, ty) in shape.fields() {
        out.push(ColumnValue::Index(cache.add_string(name)));
        push_type(ty, cache, out);
    }
}

fn push_type(ty: &ShapeType, cache: &mut ColumnCacheWriter, out: &mut Vec<ColumnValue>) {
    match ty {
        ShapeType::Primitive(p) => {
            out.push(ColumnValue::Index(((*p as u64) << 2) | CLASS_PRIMITIVE));
        }
        ShapeType::Array(element) => {
            out.push(ColumnValue::Index(CLASS_ARRAY));
            push_type(element, cache, out);
        }
        ShapeType::Object(shape) => push_object_shape(shape, cache, out),
    }
}

/// Read back a shape stored with [`encode_shape`].
pub fn decode_shape(cache: &ColumnCacheReader, index: u64) -> OvtResult<Shape> {
    let mut stream = Stream::new(cache.get_shapes(index)?);
    let ShapeType::Object(shape) = read_type(&mut stream, cache)? else {
        ovt_bail!(InvalidSerde: "shape {} is not an object", index)
    };
    stream.finish()?;
    Ok(shape)
}

fn read_type(stream: &mut Stream<'_>, cache: &ColumnCacheReader) -> OvtResult<ShapeType> {
    let header = stream.take()?;
    let payload = header >> 2;
    Ok(match header & 0b11 {
        CLASS_PRIMITIVE => ShapeType::Primitive(PrimitiveShape::try_from(payload)?),
        CLASS_ARRAY => ShapeType::array(read_type(stream, cache)?),
        CLASS_OBJECT => {
            let mut shape = Shape::new();
            for _ in 0..payload {
                let name = cache.get_string(stream.take()?)?;
                shape.insert(name, read_type(stream, cache)?);
            }
            ShapeType::Object(shape)
        }
        class => ovt_bail!(InvalidSerde: "unknown shape node class {}", class),
    })
}

/// Store `props` as the flat reference list described by `shape` and return its index.
///
/// Keys are never stored: the shape is walked field by field and each leaf pushes one reference,
/// coercing the value to the leaf type. A missing or uncoercible value stores the type's default.
pub fn encode_value(props: &Properties, shape: &Shape, cache: &mut ColumnCacheWriter) -> u64 {
    let mut out = Vec::new();
    push_fields(props, shape, cache, &mut out);
    cache.add_shapes(out)
}

fn push_fields(
    props: &Properties,
    shape: &Shape,
    cache: &mut ColumnCacheWriter,
    out: &mut Vec<ColumnValue>,
) {
    for (name, ty) in shape.fields() {
        push_value(props.get(name.as_ref()), ty, cache, out);
    }
}

fn push_value(
    value: Option<&Value>,
    ty: &ShapeType,
    cache: &mut ColumnCacheWriter,
    out: &mut Vec<ColumnValue>,
) {
    match ty {
        ShapeType::Primitive(p) => push_primitive(value, *p, cache, out),
        ShapeType::Array(element) => {
            let values = value.and_then(Value::as_array).unwrap_or_default();
            out.push(ColumnValue::Index(values.len() as u64));
            for v in values {
                push_value(Some(v), element, cache, out);
            }
        }
        ShapeType::Object(shape) => match value.and_then(Value::as_object) {
            Some(props) => push_fields(props, shape, cache, out),
            None => push_fields(&Properties::new(), shape, cache, out),
        },
    }
}

fn push_primitive(
    value: Option<&Value>,
    primitive: PrimitiveShape,
    cache: &mut ColumnCacheWriter,
    out: &mut Vec<ColumnValue>,
) {
    let pushed = match primitive {
        PrimitiveShape::String => ColumnValue::Index(
            cache.add_string(&value.and_then(Value::to_string_value).unwrap_or_default()),
        ),
        PrimitiveShape::U64 => cache
            .add_unsigned(value.and_then(Value::to_u64).unwrap_or_default())
            .into(),
        PrimitiveShape::I64 => cache
            .add_signed(value.and_then(Value::to_i64).unwrap_or_default())
            .into(),
        PrimitiveShape::F32 => cache
            .add_float(value.and_then(Value::to_f32).unwrap_or_default())
            .into(),
        PrimitiveShape::F64 => cache
            .add_double(value.and_then(Value::to_f64).unwrap_or_default())
            .into(),
        PrimitiveShape::Bool => cache
            .add_unsigned(u64::from(
                value.and_then(Value::to_bool).unwrap_or_default(),
            ))
            .into(),
        PrimitiveShape::Null => return,
    };
    out.push(pushed);
}

/// Read back properties stored with [`encode_value`] against the same shape.
pub fn decode_value(cache: &ColumnCacheReader, shape: &Shape, index: u64) -> OvtResult<Properties> {
    let mut stream = Stream::new(cache.get_shapes(index)?);
    let props = read_fields(&mut stream, shape, cache)?;
    stream.finish()?;
    Ok(props)
}

fn read_fields(
    stream: &mut Stream<'_>,
    shape: &Shape,
    cache: &ColumnCacheReader,
) -> OvtResult<Properties> {
    shape
        .fields()
        .map(|(name, ty)| Ok((name.to_string(), read_value(stream, ty, cache)?)))
        .collect()
}

fn read_value(
    stream: &mut Stream<'_>,
    ty: &ShapeType,
    cache: &ColumnCacheReader,
) -> OvtResult<Value> {
    Ok(match ty {
        ShapeType::Primitive(p) => match p {
            PrimitiveShape::String => Value::String(cache.get_string(stream.take()?)?.to_string()),
            PrimitiveShape::U64 => Value::U64(cache.get_unsigned(stream.take()?)?),
            PrimitiveShape::I64 => Value::I64(cache.get_signed(stream.take()?)?),
            PrimitiveShape::F32 => Value::F32(cache.get_float(stream.take()?)?),
            PrimitiveShape::F64 => Value::F64(cache.get_double(stream.take()?)?),
            PrimitiveShape::Bool => Value::Bool(cache.get_unsigned(stream.take()?)? != 0),
            PrimitiveShape::Null => Value::Null,
        },
        ShapeType::Array(element) => {
            let len = stream.take()?;
            let width = min_width(element);
            let limit = match width {
                0 => MAX_EMPTY_ELEMENTS,
                w => (stream.remaining() / w) as u64,
            };
            if len > limit {
                ovt_bail!(
                    InvalidSerde: "array of {} elements cannot fit in {} remaining shape values",
                    len,
                    stream.remaining()
                )
            }
            let mut values = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
            for _ in 0..len {
                values.push(read_value(stream, element, cache)?);
            }
            Value::Array(values)
        }
        ShapeType::Object(shape) => Value::Object(read_fields(stream, shape, cache)?),
    })
}

/// Elements of a type that stores nothing (`null`, or objects made only of such fields) carry no
/// entries, so their count is bounded separately.
const MAX_EMPTY_ELEMENTS: u64 = 1 << 16;

/// The fewest value-list entries one value of `ty` occupies.
fn min_width(ty: &ShapeType) -> usize {
    match ty {
        ShapeType::Primitive(PrimitiveShape::Null) => 0,
        ShapeType::Primitive(_) | ShapeType::Array(_) => 1,
        ShapeType::Object(shape) => shape.fields().map(|(_, ty)| min_width(ty)).sum(),
    }
}

/// Cursor over a decoded shapes-column entry.
struct Stream<'a> {
    values: &'a [u64],
    pos: usize,
}

impl<'a> Stream<'a> {
    fn new(values: &'a [u64]) -> Self {
        Self { values, pos: 0 }
    }

    fn take(&mut self) -> OvtResult<u64> {
        let value = self.values.get(self.pos).copied().ok_or_else(|| {
            ovt_err!(InvalidSerde: "shape value list ended after {} entries", self.values.len())
        })?;
        self.pos += 1;
        Ok(value)
    }

    fn remaining(&self) -> usize {
        self.values.len() - self.pos
    }

    fn finish(&self) -> OvtResult<()> {
        if self.pos != self.values.len() {
            ovt_bail!(
                InvalidSerde: "shape value list has {} unread entries",
                self.values.len() - self.pos
            )
        }
        Ok(())
    }
}
