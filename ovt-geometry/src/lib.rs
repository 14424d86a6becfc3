//! Geometry primitives and their compact encodings.
//!
//! Coordinates are integers in tile space. A run of points is stored as one integer per point:
//! the point's delta from its predecessor, zigzagged per axis and bit-interleaved with
//! [`ovt_weave`]. Bounding boxes are quantized to three bytes per longitude/latitude component
//! and line offsets are kept as fixed-point thousandths.

pub use bbox::*;
pub use line::*;
pub use offset::*;
pub use point::*;

mod bbox;
mod line;
mod offset;
mod point;
