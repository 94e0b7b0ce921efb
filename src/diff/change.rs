//! Comparison result types.

use super::snapshot::Snapshot;
use crate::fieldpath::Path;
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// Why a difference was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// The two values differ.
    Changed,
    /// The path is always included and its two values are equal.
    AlwaysIncluded,
}

/// PropertyDifference is a single path-qualified difference found by the
/// traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDifference {
    pub path: Path,
    pub old_value: Value,
    pub new_value: Value,
    pub kind: DifferenceKind,
}

impl PropertyDifference {
    /// Returns true unless the difference exists only because of an
    /// always-include rule.
    pub fn is_real(&self) -> bool {
        self.kind == DifferenceKind::Changed
    }
}

impl fmt::Display for PropertyDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.path, self.old_value, self.new_value)?;
        if self.kind == DifferenceKind::AlwaysIncluded {
            write!(f, " (always included)")?;
        }
        Ok(())
    }
}

/// ChangeRecord holds the sparse before/after projections of one object pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub old_value: Snapshot,
    pub new_value: Snapshot,
    /// Paths present in the two snapshots, in traversal order.
    pub paths: Vec<Path>,
}

impl ChangeRecord {
    /// Returns true if `path`, written as `Address.Street`, is one of the
    /// recorded paths.
    pub fn contains(&self, path: &str) -> bool {
        Path::parse(path).is_ok_and(|p| self.contains_path(&p))
    }

    /// Returns true if `path` is one of the recorded paths.
    pub fn contains_path(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}

/// Identity of an item inside a collection comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKey {
    /// Position, for positional comparison.
    Index(usize),
    /// Selected key, for keyed comparison.
    Key(Value),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Index(i) => write!(f, "[{}]", i),
            ItemKey::Key(k) => write!(f, "{}", k),
        }
    }
}

/// How an item changed between the two collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// ItemChange is one changed item of a collection comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChange {
    pub key: ItemKey,
    pub kind: ChangeKind,
    pub record: ChangeRecord,
}

/// ChangeSet holds the result of comparing two collections.
///
/// Unchanged items are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    pub items: Vec<ItemChange>,
}

impl ChangeSet {
    /// Creates a new empty ChangeSet.
    pub fn new() -> Self {
        ChangeSet { items: Vec::new() }
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of changed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the changed items.
    pub fn iter(&self) -> impl Iterator<Item = &ItemChange> {
        self.items.iter()
    }

    /// Items present only in the new collection.
    pub fn added(&self) -> impl Iterator<Item = &ItemChange> {
        self.of_kind(ChangeKind::Added)
    }

    /// Items present only in the old collection.
    pub fn removed(&self) -> impl Iterator<Item = &ItemChange> {
        self.of_kind(ChangeKind::Removed)
    }

    /// Items present in both collections with a real change.
    pub fn modified(&self) -> impl Iterator<Item = &ItemChange> {
        self.of_kind(ChangeKind::Modified)
    }

    /// Old snapshots, in result order.
    pub fn old_values(&self) -> impl Iterator<Item = &Snapshot> {
        self.items.iter().map(|item| &item.record.old_value)
    }

    /// New snapshots, in result order.
    pub fn new_values(&self) -> impl Iterator<Item = &Snapshot> {
        self.items.iter().map(|item| &item.record.new_value)
    }

    /// Finds the change for a key.
    pub fn get(&self, key: &ItemKey) -> Option<&ItemChange> {
        self.items.iter().find(|item| &item.key == key)
    }

    fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &ItemChange> {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

impl IntoIterator for ChangeSet {
    type Item = ItemChange;
    type IntoIter = std::vec::IntoIter<ItemChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let marker = match item.kind {
                ChangeKind::Added => '+',
                ChangeKind::Removed => '-',
                ChangeKind::Modified => '~',
            };
            write!(f, "{} {}", marker, item.key)?;
            if item.kind == ChangeKind::Modified {
                for path in &item.record.paths {
                    write!(f, "\n    {}", path)?;
                }
            }
        }
        Ok(())
    }
}
