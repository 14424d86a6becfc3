//! Tag/length/value wire codec.
//!
//! Open Vector Tiles use protobuf-style framing: each field is prefixed by a varint tag holding
//! the field number and a [`WireType`], followed by a varint, a fixed-width little-endian value, or
//! a length-delimited payload. [`WireReader`] walks a buffer with a seekable cursor and
//! [`WireWriter`] produces one, backpatching sub-message lengths in place.

pub use reader::*;
pub use varint::*;
pub use wire_type::*;
pub use writer::*;

mod reader;
mod varint;
mod wire_type;
mod writer;
