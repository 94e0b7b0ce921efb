//! Diff module - Recursive comparison of object graphs.
//!
//! This module walks two values side by side, applies the ignore and
//! always-include rules, aligns collections and assembles sparse
//! before/after snapshots of the paths that changed.

mod align;
mod change;
mod compare;
mod config;
mod engine;
mod error;
mod snapshot;


#[cfg(test)]
mod lists_test;


pub use align::*;
pub use change::*;
pub use compare::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use snapshot::*;
