//! Value module - In-memory document tree and the `Diffable` capability.
//!
//! [`Value`] is the JSON/YAML-shaped form every leaf and snapshot is stored
//! in; [`Diffable`] describes how a type is walked by the comparison engine.

mod diffable;
mod value;

pub use diffable::*;
pub use value::*;
