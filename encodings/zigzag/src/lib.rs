//! Zigzag and delta codecs for the integer sequences stored in Open Vector Tiles.
//!
//! Zigzag maps signed integers onto unsigned ones so that values near zero stay small once
//! varint encoded; delta encoding turns sorted or spatially coherent sequences into runs of small
//! differences. Index lists in the column cache combine both.

pub use compress::*;
pub use delta::*;

mod compress;
mod delta;
