use bytes::Bytes;
use ovt_error::{OvtExpect, OvtResult, ovt_bail, ovt_err};
use ovt_zigzag::zigzag_decode;

use crate::{WireType, decode_varint};

/// A cursor over a wire-encoded buffer.
///
/// The cursor is seekable so that lazy readers can jump to a recorded field offset, decode a single
/// value and come back; [`WireReader::peek_at`] wraps that pattern and always restores the
/// position, even when decoding fails.
#[derive(Debug, Clone)]
pub struct WireReader {
    buf: Bytes,
    pos: usize,
    last_wire_type: WireType,
}

impl WireReader {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            pos: 0,
            last_wire_type: WireType::Varint,
        }
    }

    /// The buffer being read.
    pub fn bytes(&self) -> &Bytes {
        &self.buf
    }

    /// Total length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The current cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the cursor has reached the end of the buffer.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// The wire type of the last tag returned by [`WireReader::read_tag`].
    pub fn last_wire_type(&self) -> WireType {
        self.last_wire_type
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, pos: usize) -> OvtResult<()> {
        if pos > self.buf.len() {
            ovt_bail!(OutOfBounds: pos, 0, self.buf.len())
        }
        self.pos = pos;
        Ok(())
    }

    /// Run `f` with the cursor at `offset`, then put the cursor back where it was.
    pub fn peek_at<T, F>(&mut self, offset: usize, f: F) -> OvtResult<T>
    where
        F: FnOnce(&mut Self) -> OvtResult<T>,
    {
        let saved = self.pos;
        self.seek(offset)?;
        let result = f(self);
        self.pos = saved;
        result
    }

    fn take(&mut self, n: usize) -> OvtResult<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| ovt_err!(OutOfBounds: self.pos.saturating_add(n), 0, self.buf.len()))?;
        let start = self.pos;
        self.pos = end;
        Ok(&self.buf[start..end])
    }

    /// Read an unsigned base-128 varint.
    #[inline]
    pub fn read_varint(&mut self) -> OvtResult<u64> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..], self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    /// Read a varint and check that it fits in a `usize`.
    pub fn read_varint_usize(&mut self) -> OvtResult<usize> {
        let value = self.read_varint()?;
        usize::try_from(value).map_err(|_| ovt_err!(InvalidSerde: "varint {} does not fit in usize", value))
    }

    /// Read a zigzag-encoded signed varint.
    #[inline]
    pub fn read_svarint(&mut self) -> OvtResult<i64> {
        self.read_varint().map(zigzag_decode)
    }

    /// Read a varint as a boolean.
    pub fn read_bool(&mut self) -> OvtResult<bool> {
        Ok(self.read_varint()? != 0)
    }

    /// Read a single raw byte.
    pub fn read_u8(&mut self) -> OvtResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read four little-endian bytes.
    pub fn read_fixed32(&mut self) -> OvtResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read eight little-endian bytes.
    pub fn read_fixed64(&mut self) -> OvtResult<u64> {
        let mut le = [0_u8; 8];
        le.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(le))
    }

    /// Read a little-endian `f32`.
    pub fn read_float(&mut self) -> OvtResult<f32> {
        self.read_fixed32().map(f32::from_bits)
    }

    /// Read a little-endian `f64`.
    pub fn read_double(&mut self) -> OvtResult<f64> {
        self.read_fixed64().map(f64::from_bits)
    }

    /// Read a length-delimited payload without copying it.
    pub fn read_bytes(&mut self) -> OvtResult<Bytes> {
        let len = self.read_varint_usize()?;
        let start = self.pos;
        self.take(len)?;
        Ok(self.buf.slice(start..self.pos))
    }

    /// Read a length-delimited UTF-8 string.
    pub fn read_string(&mut self) -> OvtResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ovt_err!(InvalidSerde: "string is not valid UTF-8: {}", e))
    }

    /// Read a field tag, returning its field number and wire type.
    pub fn read_tag(&mut self) -> OvtResult<(u32, WireType)> {
        let tag = self.read_varint()?;
        let field = u32::try_from(tag >> 3)
            .map_err(|_| ovt_err!(InvalidSerde: "field number {} is too large", tag >> 3))?;
        let low_bits = u8::try_from(tag & 0x7).ok().ovt_expect("masked to three bits");
        let wire_type = WireType::try_from(low_bits)?;
        self.last_wire_type = wire_type;
        Ok((field, wire_type))
    }

    /// Read the length prefix of a sub-message and return the absolute position where it ends.
    pub fn read_message_end(&mut self) -> OvtResult<usize> {
        let len = self.read_varint_usize()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| ovt_err!(OutOfBounds: self.pos.saturating_add(len), 0, self.buf.len()))?;
        Ok(end)
    }

    /// Read a packed run of varints.
    pub fn read_packed_varints(&mut self) -> OvtResult<Vec<u64>> {
        let end = self.read_message_end()?;
        let mut values = Vec::new();
        while self.pos < end {
            values.push(self.read_varint()?);
        }
        if self.pos != end {
            ovt_bail!(InvalidSerde: "packed varints overran their length by {} bytes", self.pos - end)
        }
        Ok(values)
    }

    /// Read a packed run of zigzag-encoded varints.
    pub fn read_packed_svarints(&mut self) -> OvtResult<Vec<i64>> {
        Ok(self
            .read_packed_varints()?
            .into_iter()
            .map(zigzag_decode)
            .collect())
    }

    /// Skip over a field payload of the given wire type.
    pub fn skip(&mut self, wire_type: WireType) -> OvtResult<()> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                let end = self.read_message_end()?;
                self.pos = end;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    /// Iterate over the fields between the cursor and `end`.
    ///
    /// `f` receives each field number and wire type with the cursor positioned at the payload.
    /// If `f` leaves the cursor where it was, the payload is skipped, so callers only handle the
    /// fields they care about.
    pub fn read_fields<F>(&mut self, end: usize, mut f: F) -> OvtResult<()>
    where
        F: FnMut(u32, WireType, &mut Self) -> OvtResult<()>,
    {
        if end > self.buf.len() {
            ovt_bail!(OutOfBounds: end, 0, self.buf.len())
        }
        while self.pos < end {
            let (field, wire_type) = self.read_tag()?;
            let start = self.pos;
            f(field, wire_type, self)?;
            if self.pos == start {
                self.skip(wire_type)?;
            }
        }
        if self.pos != end {
            ovt_bail!(InvalidSerde: "message fields overran their end at {} by {} bytes", end, self.pos - end)
        }
        Ok(())
    }
}
