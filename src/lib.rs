//! # Sparse Diff
//!
//! Path-qualified change detection for nested object graphs.
//!
//! Two values are walked side by side and every path whose values differ is
//! recorded. Ignore rules hide paths entirely, always-include rules force
//! paths into the result, and the differences are assembled into sparse
//! before/after snapshots holding only what changed.
//!
//! ## Modules
//!
//! - [`value`] - In-memory document tree and the [`Diffable`] capability types implement
//! - [`fieldpath`] - Paths, wildcard patterns and the ignore / always-include matcher
//! - [`diff`] - Traversal, collection alignment, snapshots and the public comparison API
//!
//! ## Example
//!
//! ```
//! use sparse_diff::{compare_objects, diffable_record, ComparisonConfig};
//!
//! struct Person {
//!     name: String,
//!     role: String,
//! }
//!
//! diffable_record!(Person { "Name" => name, "Role" => role });
//!
//! let old = Person { name: "Alice".into(), role: "Admin".into() };
//! let new = Person { name: "Alicia".into(), role: "Admin".into() };
//! let config = ComparisonConfig::builder().ignore("Name").build().unwrap();
//!
//! assert!(compare_objects(&old, &new, Some(&config)).unwrap().is_none());
//! assert!(compare_objects(&old, &new, None).unwrap().unwrap().contains("Name"));
//! ```

pub mod diff;
pub mod fieldpath;
pub mod value;

pub use diff::{
    compare_lists, compare_lists_keyed, compare_objects, ChangeKind, ChangeRecord, ChangeSet,
    ComparisonConfig, ComparisonConfigBuilder, ConfigError, DiffError, DiffResult, ItemChange,
    ItemKey, KeySelector, PropertyDifference, Snapshot,
};
pub use fieldpath::{Path, PathElement, PathMatcher, Pattern, PatternSet, Rule};
pub use value::{Diffable, FieldEntry, Shape, Value};
