use ovt_error::{OvtResult, ovt_bail};

/// Largest value a quantized 24-bit component can take.
const QUANT_MAX: f64 = ((1 << 24) - 1) as f64;

/// Size of a quantized [`BBox`].
pub const BBOX_2D_BYTES: usize = 12;
/// Size of a quantized [`BBox3D`].
pub const BBOX_3D_BYTES: usize = 20;

/// A longitude/latitude bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BBox {
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }
}

/// A longitude/latitude bounding box with a vertical range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox3D {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl BBox3D {
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64, near: f64, far: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
            near,
            far,
        }
    }
}

/// Either kind of bounding box a feature may carry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundingBox {
    BBox(BBox),
    BBox3D(BBox3D),
}

impl From<BBox> for BoundingBox {
    fn from(value: BBox) -> Self {
        Self::BBox(value)
    }
}

impl From<BBox3D> for BoundingBox {
    fn from(value: BBox3D) -> Self {
        Self::BBox3D(value)
    }
}

impl BoundingBox {
    pub fn is_3d(&self) -> bool {
        matches!(self, Self::BBox3D(_))
    }

    /// Pack the box into 12 bytes (2D) or 20 bytes (3D).
    ///
    /// Each longitude/latitude component is clamped to its valid range and scaled onto 24 bits,
    /// so a component survives a round trip to within about 1.1e-5 degrees. The vertical range
    /// is stored as two little-endian `f32`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantize(&self) -> Vec<u8> {
        let (left, bottom, right, top) = match self {
            Self::BBox(b) => (b.left, b.bottom, b.right, b.top),
            Self::BBox3D(b) => (b.left, b.bottom, b.right, b.top),
        };
        let mut out = Vec::with_capacity(if self.is_3d() {
            BBOX_3D_BYTES
        } else {
            BBOX_2D_BYTES
        });
        push_u24(&mut out, quantize_lon(left));
        push_u24(&mut out, quantize_lat(bottom));
        push_u24(&mut out, quantize_lon(right));
        push_u24(&mut out, quantize_lat(top));
        if let Self::BBox3D(b) = self {
            out.extend_from_slice(&(b.near as f32).to_le_bytes());
            out.extend_from_slice(&(b.far as f32).to_le_bytes());
        }
        out
    }

    /// Inverse of [`BoundingBox::quantize`]; the dimension is taken from the byte length.
    pub fn dequantize(bytes: &[u8]) -> OvtResult<Self> {
        if bytes.len() != BBOX_2D_BYTES && bytes.len() != BBOX_3D_BYTES {
            ovt_bail!(InvalidSerde: "quantized bbox must be 12 or 20 bytes, got {}", bytes.len())
        }
        let left = dequantize_lon(read_u24(&bytes[0..3]));
        let bottom = dequantize_lat(read_u24(&bytes[3..6]));
        let right = dequantize_lon(read_u24(&bytes[6..9]));
        let top = dequantize_lat(read_u24(&bytes[9..12]));
        if bytes.len() == BBOX_2D_BYTES {
            return Ok(Self::BBox(BBox::new(left, bottom, right, top)));
        }
        let near = f32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let far = f32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        Ok(Self::BBox3D(BBox3D::new(
            left,
            bottom,
            right,
            top,
            f64::from(near),
            f64::from(far),
        )))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize_lon(lon: f64) -> u32 {
    ((lon.clamp(-180.0, 180.0) + 180.0) * QUANT_MAX / 360.0).round() as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize_lat(lat: f64) -> u32 {
    ((lat.clamp(-90.0, 90.0) + 90.0) * QUANT_MAX / 180.0).round() as u32
}

fn dequantize_lon(q: u32) -> f64 {
    f64::from(q) * 360.0 / QUANT_MAX - 180.0
}

fn dequantize_lat(q: u32) -> f64 {
    f64::from(q) * 180.0 / QUANT_MAX - 90.0
}

fn push_u24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

fn read_u24(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
}

#[cfg(test)]
mod tests {
    use ovt_error::OvtError;
    use rstest::rstest;

    use super::*;

    const EPSILON: f64 = 1.1e-5;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= EPSILON, "{a} != {b}");
    }

    #[rstest]
    #[case(BBox::new(-180.0, -90.0, 180.0, 90.0))]
    #[case(BBox::new(13.4, 52.5, 13.41, 52.55))]
    #[case(BBox::new(-0.000_001, 0.0, 0.000_001, 1e-9))]
    fn bbox_2d_within_epsilon(#[case] bbox: BBox) {
        let bytes = BoundingBox::from(bbox).quantize();
        assert_eq!(bytes.len(), BBOX_2D_BYTES);
        let BoundingBox::BBox(back) = BoundingBox::dequantize(&bytes).unwrap() else {
            panic!("expected a 2D bbox");
        };
        assert_close(back.left, bbox.left);
        assert_close(back.bottom, bbox.bottom);
        assert_close(back.right, bbox.right);
        assert_close(back.top, bbox.top);
    }

    #[test]
    fn bbox_3d_keeps_vertical_range() {
        let bbox = BBox3D::new(-73.99, 40.7, -73.98, 40.71, -12.5, 830.25);
        let bytes = BoundingBox::from(bbox).quantize();
        assert_eq!(bytes.len(), BBOX_3D_BYTES);
        let BoundingBox::BBox3D(back) = BoundingBox::dequantize(&bytes).unwrap() else {
            panic!("expected a 3D bbox");
        };
        assert_close(back.left, bbox.left);
        assert_close(back.top, bbox.top);
        assert_eq!(back.near, -12.5);
        assert_eq!(back.far, 830.25);
    }

    #[test]
    fn out_of_range_is_clamped() {
        let bytes = BoundingBox::from(BBox::new(-200.0, -100.0, 200.0, 100.0)).quantize();
        assert_eq!(&bytes[0..3], &[0, 0, 0]);
        assert_eq!(&bytes[6..9], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn bad_length_is_rejected() {
        assert!(matches!(
            BoundingBox::dequantize(&[0; 13]),
            Err(OvtError::InvalidSerde(..))
        ));
    }
}
