use bytes::Bytes;
use ovt_error::{OvtResult, ovt_err};
use ovt_zigzag::zigzag_encode;

use crate::{WireType, encode_varint, make_tag, varint_len};

/// An append-only buffer producing wire-encoded bytes.
#[derive(Debug, Default, Clone)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning its bytes.
    pub fn finish(self) -> Bytes {
        Bytes::from(self.buf)
    }

    /// Append `value` as a base-128 varint.
    #[inline]
    pub fn write_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    /// Append `value` zigzag-encoded, so small negative numbers stay short.
    #[inline]
    pub fn write_svarint(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    /// Append `value` as a one-byte varint.
    pub fn write_bool(&mut self, value: bool) {
        self.write_varint(u64::from(value));
    }

    /// Append a single raw byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append four little-endian bytes.
    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append eight little-endian bytes.
    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append the IEEE-754 bits of `value` as a fixed32.
    pub fn write_float(&mut self, value: f32) {
        self.write_fixed32(value.to_bits());
    }

    /// Append the IEEE-754 bits of `value` as a fixed64.
    pub fn write_double(&mut self, value: f64) {
        self.write_fixed64(value.to_bits());
    }

    /// Append bytes with no length prefix.
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a varint length prefix followed by `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.write_raw_bytes(bytes);
    }

    /// Append the tag for `field` framed as `wire_type`.
    #[inline]
    pub fn write_tag(&mut self, field: u32, wire_type: WireType) {
        self.write_varint(make_tag(field, wire_type));
    }

    /// Write a varint field.
    pub fn write_varint_field(&mut self, field: u32, value: u64) {
        self.write_tag(field, WireType::Varint);
        self.write_varint(value);
    }

    /// Write a zigzag varint field. Readers use [`crate::WireReader::read_svarint`].
    pub fn write_svarint_field(&mut self, field: u32, value: i64) {
        self.write_tag(field, WireType::Varint);
        self.write_svarint(value);
    }

    /// Write a bool field.
    pub fn write_bool_field(&mut self, field: u32, value: bool) {
        self.write_tag(field, WireType::Varint);
        self.write_bool(value);
    }

    /// Write a fixed32 field.
    pub fn write_fixed32_field(&mut self, field: u32, value: u32) {
        self.write_tag(field, WireType::Fixed32);
        self.write_fixed32(value);
    }

    /// Write a fixed64 field.
    pub fn write_fixed64_field(&mut self, field: u32, value: u64) {
        self.write_tag(field, WireType::Fixed64);
        self.write_fixed64(value);
    }

    /// Write an `f32` field as fixed32.
    pub fn write_float_field(&mut self, field: u32, value: f32) {
        self.write_tag(field, WireType::Fixed32);
        self.write_float(value);
    }

    /// Write an `f64` field as fixed64.
    pub fn write_double_field(&mut self, field: u32, value: f64) {
        self.write_tag(field, WireType::Fixed64);
        self.write_double(value);
    }

    /// Write a length-delimited field holding `bytes`.
    pub fn write_bytes_field(&mut self, field: u32, bytes: &[u8]) {
        self.write_tag(field, WireType::LengthDelimited);
        self.write_bytes(bytes);
    }

    /// Write a UTF-8 string as a length-delimited field.
    pub fn write_string_field(&mut self, field: u32, value: &str) {
        self.write_bytes_field(field, value.as_bytes());
    }

    /// Write `values` as one length-delimited field of concatenated varints.
    pub fn write_packed_varints(&mut self, field: u32, values: &[u64]) {
        self.write_tag(field, WireType::LengthDelimited);
        let len: usize = values.iter().map(|&v| varint_len(v)).sum();
        self.write_varint(len as u64);
        for &value in values {
            self.write_varint(value);
        }
    }

    /// Write a length-delimited sub-message whose body is produced by `f`.
    ///
    /// One byte is reserved for the length before `f` runs. When the body turns out to need a
    /// longer length prefix, the body is shifted right to make room.
    pub fn write_message<F>(&mut self, field: u32, f: F) -> OvtResult<()>
    where
        F: FnOnce(&mut Self) -> OvtResult<()>,
    {
        self.write_tag(field, WireType::LengthDelimited);
        let len_pos = self.buf.len();
        self.buf.push(0);
        let body_start = self.buf.len();

        f(self)?;

        let body_len = self.buf.len() - body_start;
        let mut prefix = Vec::with_capacity(2);
        encode_varint(body_len as u64, &mut prefix);
        let slot = self
            .buf
            .get_mut(len_pos..body_start)
            .ok_or_else(|| ovt_err!(OutOfBounds: body_start, 0, len_pos))?;
        if prefix.len() == 1 {
            slot.copy_from_slice(&prefix);
        } else {
            self.buf.splice(len_pos..body_start, prefix);
        }
        Ok(())
    }
}
