//! Field path module - addresses inside a compared object graph and the
//! patterns that select them for ignore / always-include rules.

mod path;
mod pattern;

pub use path::*;
pub use pattern::*;
