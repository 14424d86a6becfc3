use zigzag::ZigZag as ExternalZigZag;

/// Map a signed integer onto an unsigned one: `0, -1, 1, -2, 2, ...` becomes `0, 1, 2, 3, 4, ...`.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    <i64 as ExternalZigZag>::encode(value)
}

/// The inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    <i64 as ExternalZigZag>::decode(value)
}

/// 32-bit variant of [`zigzag_encode`], used for coordinates.
#[inline]
pub fn zigzag_encode_i32(value: i32) -> u32 {
    <i32 as ExternalZigZag>::encode(value)
}

/// The inverse of [`zigzag_encode_i32`].
#[inline]
pub fn zigzag_decode_i32(value: u32) -> i32 {
    <i32 as ExternalZigZag>::decode(value)
}
