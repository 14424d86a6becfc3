//! The column cache: one deduplicated store of every string, number, point run, index list,
//! encoded shape value and bounding box referenced by the features of a tile.
//!
//! Features never store values inline. They store indices into the cache, which is written once
//! after all layers. Numeric columns are re-ordered at that point so that the most referenced
//! values get the smallest indices, which is why writers hand out [`NumberRef`] handles instead of
//! indices for them.

pub use kind::*;
pub use numeric::*;
pub use reader::*;
pub use vertex::*;
pub use writer::*;

mod kind;
mod numeric;
mod reader;
mod vertex;
mod writer;
