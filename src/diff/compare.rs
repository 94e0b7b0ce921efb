//! Public comparison entry points.

use super::align::{align_keyed, align_positional, Pair};
use super::change::{ChangeKind, ChangeRecord, ChangeSet, ItemChange, ItemKey};
use super::config::{ComparisonConfig, KeySelector, DEFAULT_CONFIG};
use super::engine::differences;
use super::error::{DiffError, DiffResult};
use super::snapshot::ChangeBuilder;
use crate::value::Diffable;
use tracing::debug;

/// Compares two objects and returns the sparse record of what changed, or
/// `None` when nothing qualifies.
///
/// With `include_unchanged_always_included` disabled, always-included paths
/// only surface alongside a real change.
///
/// ```
/// use sparse_diff::{compare_objects, ComparisonConfig, Value};
///
/// let old = sparse_diff::value::from_json(r#"{"Name": "Alice", "Role": "Admin"}"#).unwrap();
/// let new = sparse_diff::value::from_json(r#"{"Name": "Alicia", "Role": "Admin"}"#).unwrap();
/// let config = ComparisonConfig::builder().always_include("Role").build().unwrap();
///
/// let record = compare_objects(&old, &new, Some(&config)).unwrap().unwrap();
/// assert_eq!(record.new_value.value_at("Name"), Some(&Value::from("Alicia")));
/// assert_eq!(record.new_value.value_at("Role"), Some(&Value::from("Admin")));
/// ```
pub fn compare_objects<T: Diffable>(
    old: &T,
    new: &T,
    config: Option<&ComparisonConfig>,
) -> DiffResult<Option<ChangeRecord>> {
    let config = config.unwrap_or(&*DEFAULT_CONFIG);
    let record = compare_roots(old, new, config, config.include_unchanged_always_included())?;
    debug!(changed = record.is_some(), "compared objects");
    Ok(record)
}

/// Compares two collections.
///
/// Items are paired by the configured key selector when there is one and by
/// position otherwise.
pub fn compare_lists<T: Diffable>(
    old: &[T],
    new: &[T],
    config: Option<&ComparisonConfig>,
) -> DiffResult<ChangeSet> {
    let config = config.unwrap_or(&*DEFAULT_CONFIG);
    match config.key_selector() {
        Some(selector) => keyed(old, new, selector, config),
        None => positional(old, new, config),
    }
}

/// Compares two collections by key. Fails when no key selector is
/// configured.
pub fn compare_lists_keyed<T: Diffable>(
    old: &[T],
    new: &[T],
    config: &ComparisonConfig,
) -> DiffResult<ChangeSet> {
    let selector = config
        .key_selector()
        .ok_or_else(|| DiffError::configuration("keyed comparison requires a key selector"))?;
    keyed(old, new, selector, config)
}

fn keyed<T: Diffable>(
    old: &[T],
    new: &[T],
    selector: &KeySelector,
    config: &ComparisonConfig,
) -> DiffResult<ChangeSet> {
    let pairs = align_keyed(&as_dyn(old), &as_dyn(new), selector)?;
    let changes = classify(pairs, ItemKey::Key, config)?;
    debug!(
        added = changes.added().count(),
        removed = changes.removed().count(),
        modified = changes.modified().count(),
        "compared collections by key"
    );
    Ok(changes)
}

fn positional<T: Diffable>(
    old: &[T],
    new: &[T],
    config: &ComparisonConfig,
) -> DiffResult<ChangeSet> {
    let pairs = align_positional(&as_dyn(old), &as_dyn(new));
    let changes = classify(pairs, ItemKey::Index, config)?;
    debug!(
        added = changes.added().count(),
        removed = changes.removed().count(),
        modified = changes.modified().count(),
        "compared collections by position"
    );
    Ok(changes)
}

fn as_dyn<T: Diffable>(items: &[T]) -> Vec<&dyn Diffable> {
    items.iter().map(|item| item as &dyn Diffable).collect()
}

/// Every item is its own comparison root. Added and removed items always
/// yield a record of the whole item, even a null one. Items present on both
/// sides are reported only for a real change.
fn classify<K>(
    pairs: Vec<Pair<'_, K>>,
    to_key: impl Fn(K) -> ItemKey,
    config: &ComparisonConfig,
) -> DiffResult<ChangeSet> {
    let mut changes = ChangeSet::new();
    for pair in pairs {
        let (kind, record) = match (pair.old, pair.new) {
            (Some(old), Some(new)) => match compare_roots(old, new, config, false)? {
                Some(record) => (ChangeKind::Modified, record),
                None => continue,
            },
            (None, Some(new)) => {
                let record = ChangeBuilder::new(None, Some(new)).build_root()?;
                (ChangeKind::Added, record)
            }
            (Some(old), None) => {
                let record = ChangeBuilder::new(Some(old), None).build_root()?;
                (ChangeKind::Removed, record)
            }
            (None, None) => continue,
        };
        changes.items.push(ItemChange {
            key: to_key(pair.key),
            kind,
            record,
        });
    }
    Ok(changes)
}

/// Runs the traversal and builds the record. `keep_unchanged` decides
/// whether always-included differences alone produce a record.
fn compare_roots(
    old: &dyn Diffable,
    new: &dyn Diffable,
    config: &ComparisonConfig,
    keep_unchanged: bool,
) -> DiffResult<Option<ChangeRecord>> {
    let differences = differences(old, new, config)?;
    if !keep_unchanged && !differences.iter().any(|d| d.is_real()) {
        return Ok(None);
    }
    ChangeBuilder::new(Some(old), Some(new)).build(&differences)
}
