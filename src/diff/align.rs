//! Collection alignment: pairs the elements of two sequences by position or
//! by a selected key.

use super::config::KeySelector;
use super::error::{DiffError, DiffResult, Side};
use crate::value::{Diffable, Shape, Value};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Stand-in for the missing side of an unmatched pair.
pub(crate) struct Missing;

impl Diffable for Missing {
    fn shape(&self) -> Shape<'_> {
        Shape::Absent
    }
}

/// Pair is one aligned element; a side is `None` when the element exists
/// only in the other collection.
#[derive(Clone, Copy)]
pub struct Pair<'a, K> {
    pub key: K,
    pub old: Option<&'a dyn Diffable>,
    pub new: Option<&'a dyn Diffable>,
}

impl<'a, K> Pair<'a, K> {
    pub(crate) fn old_or_missing(&self) -> &'a dyn Diffable {
        self.old.unwrap_or(&Missing)
    }

    pub(crate) fn new_or_missing(&self) -> &'a dyn Diffable {
        self.new.unwrap_or(&Missing)
    }
}

/// Pairs element `i` with element `i`, padding the shorter side.
pub fn align_positional<'a>(
    old: &[&'a dyn Diffable],
    new: &[&'a dyn Diffable],
) -> Vec<Pair<'a, usize>> {
    (0..old.len().max(new.len()))
        .map(|i| Pair {
            key: i,
            old: old.get(i).copied(),
            new: new.get(i).copied(),
        })
        .collect()
}

/// Pairs elements by the key `selector` extracts from them.
///
/// Pairs follow the old collection's order, then keys found only in the new
/// collection in their order. Every element must produce a key, and keys
/// must be unique within each side.
pub fn align_keyed<'a>(
    old: &[&'a dyn Diffable],
    new: &[&'a dyn Diffable],
    selector: &KeySelector,
) -> DiffResult<Vec<Pair<'a, Value>>> {
    let old_by_key = index_by_key(old, selector, Side::Old)?;
    let mut new_by_key = index_by_key(new, selector, Side::New)?;

    let mut pairs = Vec::with_capacity(old_by_key.len() + new_by_key.len());
    for (key, item) in old_by_key {
        let counterpart = new_by_key.shift_remove(&key);
        pairs.push(Pair {
            key,
            old: Some(item),
            new: counterpart,
        });
    }
    for (key, item) in new_by_key {
        pairs.push(Pair {
            key,
            old: None,
            new: Some(item),
        });
    }
    Ok(pairs)
}

fn index_by_key<'a>(
    items: &[&'a dyn Diffable],
    selector: &KeySelector,
    side: Side,
) -> DiffResult<IndexMap<Value, &'a dyn Diffable>> {
    let mut by_key = IndexMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let key = selector.select(*item)?.ok_or_else(|| {
            DiffError::configuration(format!(
                "key selector {:?} produced no key for {} item [{}]",
                selector, side, i
            ))
        })?;
        match by_key.entry(key) {
            Entry::Occupied(entry) => return Err(DiffError::duplicate_key(side, entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(*item);
            }
        }
    }
    Ok(by_key)
}
