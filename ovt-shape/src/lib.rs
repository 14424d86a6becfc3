//! Shapes and the values they describe.
//!
//! A [`Shape`] is the schema of a properties object, shared by every feature in a layer and stored
//! once. Feature properties are stored as a flat list of column references produced by walking the
//! shape, so a value list can only be read back with the shape it was written against.

pub use codec::*;
pub use shape::*;
pub use value::*;

mod codec;
mod shape;
mod value;
