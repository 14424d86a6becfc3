/// Fixed-point scale of a line offset: three decimal digits.
const OFFSET_SCALE: f64 = 1000.0;

/// Store a line offset as whole thousandths, rounding down.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_offset(offset: f64) -> i64 {
    (offset * OFFSET_SCALE).floor() as i64
}

/// Inverse of [`encode_offset`], exact to the nearest thousandth below the original.
#[allow(clippy::cast_precision_loss)]
pub fn decode_offset(encoded: i64) -> f64 {
    encoded as f64 / OFFSET_SCALE
}
