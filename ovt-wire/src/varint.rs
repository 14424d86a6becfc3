use ovt_error::{OvtResult, ovt_bail};

/// A 64-bit value never needs more than ten 7-bit groups.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `out` as a base-128 little-endian varint.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes [`encode_varint`] emits for `value`.
#[inline]
pub fn varint_len(value: u64) -> usize {
    // 1 byte per started group of 7 bits, with zero still taking one byte.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode one varint from the front of `bytes`, returning the value and the bytes consumed.
///
/// `base` is the absolute offset of `bytes[0]`, used only for error reporting.
pub fn decode_varint(bytes: &[u8], base: usize) -> OvtResult<(u64, usize)> {
    let mut value = 0_u64;
    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        // The tenth group only has room for the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            ovt_bail!(VarintOverflow: base)
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte < 0x80 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() < MAX_VARINT_LEN {
        ovt_bail!(OutOfBounds: base + bytes.len(), base, base + bytes.len())
    }
    ovt_bail!(VarintOverflow: base)
}

#[cfg(test)]
mod test {
    use ovt_error::OvtError;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(127, &[0x7F])]
    #[case(128, &[0x80, 0x01])]
    #[case(300, &[0xAC, 0x02])]
    #[case(u64::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01])]
    fn test_varint_bytes(#[case] value: u64, #[case] bytes: &[u8]) {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        assert_eq!(out, bytes);
        assert_eq!(varint_len(value), bytes.len());
        assert_eq!(decode_varint(bytes, 0).unwrap(), (value, bytes.len()));
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xFF; 11];
        assert!(matches!(
            decode_varint(&bytes, 4),
            Err(OvtError::VarintOverflow(4, _))
        ));
        // Ten bytes, but the last one carries more than the single bit left in a u64.
        let mut bytes = [0xFF; 10];
        bytes[9] = 0x02;
        assert!(matches!(
            decode_varint(&bytes, 0),
            Err(OvtError::VarintOverflow(0, _))
        ));
    }

    #[test]
    fn test_varint_truncated() {
        assert!(matches!(
            decode_varint(&[0x80, 0x80], 10),
            Err(OvtError::OutOfBounds(12, 10, 12, _))
        ));
    }
}
