//! Sparse snapshots and the change builder that assembles them.

use super::change::{ChangeRecord, PropertyDifference};
use super::error::{DiffError, DiffResult};
use crate::fieldpath::{eq_ignore_case, Path, PathElement};
use crate::value::{Diffable, FieldEntry, Map, Shape, Value};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Snapshot is a sparse tree holding only the paths that differ.
///
/// Nodes keep their children in the order the differences were found.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Leaf(Value),
    Node(IndexMap<PathElement, Snapshot>),
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::Node(IndexMap::new())
    }
}

impl Snapshot {
    /// Returns true for a node without children.
    pub fn is_empty(&self) -> bool {
        matches!(self, Snapshot::Node(children) if children.is_empty())
    }

    /// Stores `value` at `path`, creating intermediate nodes. An empty path
    /// replaces the whole snapshot.
    pub fn insert(&mut self, path: &[PathElement], value: Value) {
        let Some((head, rest)) = path.split_first() else {
            *self = Snapshot::Leaf(value);
            return;
        };
        if let Snapshot::Leaf(_) = self {
            *self = Snapshot::default();
        }
        if let Snapshot::Node(children) = self {
            children
                .entry(head.clone())
                .or_default()
                .insert(rest, value);
        }
    }

    /// Returns the subtree at `path`.
    pub fn get(&self, path: &Path) -> Option<&Snapshot> {
        let mut current = self;
        for element in path {
            match current {
                Snapshot::Node(children) => current = children.get(element)?,
                Snapshot::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Returns the leaf value at a path written as `Address.Street`.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        match self.get(&Path::parse(path).ok()?)? {
            Snapshot::Leaf(value) => Some(value),
            Snapshot::Node(_) => None,
        }
    }

    /// Converts the snapshot to a plain value; index children become
    /// `"[i]"` keys.
    pub fn to_value(&self) -> Value {
        match self {
            Snapshot::Leaf(value) => value.clone(),
            Snapshot::Node(children) => Value::Map(
                children
                    .iter()
                    .map(|(element, child)| (element_key(element), child.to_value()))
                    .collect::<Map>(),
            ),
        }
    }
}

fn element_key(element: &PathElement) -> String {
    match element {
        PathElement::FieldName(name) => name.clone(),
        PathElement::Index(i) => format!("[{}]", i),
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Snapshot::Leaf(value) => value.serialize(serializer),
            Snapshot::Node(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (element, child) in children {
                    map.serialize_entry(&element_key(element), child)?;
                }
                map.end()
            }
        }
    }
}

fn find_field<'a, 'f>(
    fields: &'f [FieldEntry<'a>],
    name: &str,
    ignore_case: bool,
) -> Option<&'f FieldEntry<'a>> {
    let exact = fields.iter().find(|f| f.name == name);
    if exact.is_some() || !ignore_case {
        return exact;
    }
    fields.iter().find(|f| eq_ignore_case(&f.name, name))
}

/// Reads the value at `path` inside `root`. Missing and absent values both
/// yield `None`. Field names must match exactly.
pub fn value_at(root: &dyn Diffable, path: &Path) -> DiffResult<Option<Value>> {
    lookup(root, path, false)
}

/// Like [`value_at`], but a field name without an exact match falls back to
/// the first field equal to it ignoring case. Used by key selectors.
pub fn value_at_ignore_case(root: &dyn Diffable, path: &Path) -> DiffResult<Option<Value>> {
    lookup(root, path, true)
}

fn lookup(root: &dyn Diffable, path: &Path, ignore_case: bool) -> DiffResult<Option<Value>> {
    let mut walked = Path::new();
    let mut current = root;

    for element in path {
        let shape = current.shape();
        let next = match (&shape, element) {
            (Shape::Record(fields) | Shape::Map(fields), PathElement::FieldName(name)) => {
                match find_field(fields, name, ignore_case) {
                    Some(FieldEntry { value: Ok(v), .. }) => Some(*v),
                    Some(FieldEntry { value: Err(e), .. }) => {
                        return Err(DiffError::field_access(walked.field(name.clone()), e.message.clone()));
                    }
                    None => None,
                }
            }
            (Shape::Sequence(items), PathElement::Index(i)) => items.get(*i).copied(),
            _ => None,
        };
        match next {
            Some(child) => current = child,
            None => return Ok(None),
        }
        walked.push(element.clone());
    }

    let value = to_value_at(current, &mut walked)?;
    Ok(if value.is_null() { None } else { Some(value) })
}

/// Converts a whole subtree to a [`Value`]. A reference back to a value
/// already being converted becomes `Null`.
pub fn to_value(node: &dyn Diffable) -> DiffResult<Value> {
    to_value_at(node, &mut Path::new())
}

pub(crate) fn to_value_at(node: &dyn Diffable, path: &mut Path) -> DiffResult<Value> {
    convert(node, path, &mut Vec::new())
}

fn convert(node: &dyn Diffable, path: &mut Path, stack: &mut Vec<usize>) -> DiffResult<Value> {
    let identity = node.identity();
    if let Some(id) = identity {
        if stack.contains(&id) {
            tracing::trace!(path = %path, "back-reference converted to null");
            return Ok(Value::Null);
        }
        stack.push(id);
    }

    let value = match node.shape() {
        Shape::Absent => Value::Null,
        Shape::Leaf(value) => value,
        Shape::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(PathElement::Index(i));
                let converted = convert(item, path, stack);
                path.pop();
                list.push(converted?);
            }
            Value::List(list)
        }
        Shape::Record(fields) | Shape::Map(fields) => {
            let mut map = Map::new();
            for field in fields {
                path.push(PathElement::FieldName(field.name.to_string()));
                let converted = match field.value {
                    Ok(v) => convert(v, path, stack),
                    Err(e) => Err(DiffError::field_access(&*path, e.message)),
                };
                path.pop();
                map.set(field.name.into_owned(), converted?);
            }
            Value::Map(map)
        }
    };

    if identity.is_some() {
        stack.pop();
    }
    Ok(value)
}

/// ChangeBuilder turns recorded differences into a [`ChangeRecord`].
///
/// Values are read again from the roots rather than taken from the
/// differences.
pub struct ChangeBuilder<'a> {
    old_root: Option<&'a dyn Diffable>,
    new_root: Option<&'a dyn Diffable>,
}

impl<'a> ChangeBuilder<'a> {
    pub fn new(old_root: Option<&'a dyn Diffable>, new_root: Option<&'a dyn Diffable>) -> Self {
        ChangeBuilder { old_root, new_root }
    }

    /// Returns `None` when there are no differences.
    pub fn build(&self, differences: &[PropertyDifference]) -> DiffResult<Option<ChangeRecord>> {
        if differences.is_empty() {
            return Ok(None);
        }
        let paths = differences.iter().map(|d| d.path.clone()).collect();
        self.build_paths(paths).map(Some)
    }

    /// Builds a record for the whole root: one path, the empty one, with
    /// both roots as leaves. A missing root becomes `null`.
    pub fn build_root(&self) -> DiffResult<ChangeRecord> {
        self.build_paths(vec![Path::new()])
    }

    fn build_paths(&self, paths: Vec<Path>) -> DiffResult<ChangeRecord> {
        let mut old_value = Snapshot::default();
        let mut new_value = Snapshot::default();

        for path in &paths {
            old_value.insert(path.as_slice(), fetch(self.old_root, path)?.unwrap_or_default());
            new_value.insert(path.as_slice(), fetch(self.new_root, path)?.unwrap_or_default());
        }

        Ok(ChangeRecord {
            old_value,
            new_value,
            paths,
        })
    }
}

fn fetch(root: Option<&dyn Diffable>, path: &Path) -> DiffResult<Option<Value>> {
    match root {
        Some(root) => value_at(root, path),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::change::DifferenceKind;
    use crate::value::{from_json, FieldAccessError};
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn difference(p: &str) -> PropertyDifference {
        PropertyDifference {
            path: path(p),
            old_value: Value::Null,
            new_value: Value::Null,
            kind: DifferenceKind::Changed,
        }
    }

    #[test]
    fn test_snapshot_insert_nested() {
        let mut snapshot = Snapshot::default();
        snapshot.insert(path("Address.Street").as_slice(), Value::from("Main"));
        snapshot.insert(path("PhoneNumbers[1]").as_slice(), Value::from("555"));
        snapshot.insert(path("Name").as_slice(), Value::from("Alice"));

        assert_eq!(snapshot.value_at("Address.Street"), Some(&Value::from("Main")));
        assert_eq!(snapshot.value_at("PhoneNumbers[1]"), Some(&Value::from("555")));
        assert_eq!(snapshot.value_at("PhoneNumbers[0]"), None);
        assert_eq!(snapshot.value_at("Address"), None);
        assert!(snapshot.get(&path("Address")).is_some());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(
            json,
            r#"{"Address":{"Street":"Main"},"PhoneNumbers":{"[1]":"555"},"Name":"Alice"}"#
        );
    }

    #[test]
    fn test_snapshot_empty_path_replaces_root() {
        let mut snapshot = Snapshot::default();
        assert!(snapshot.is_empty());
        snapshot.insert(&[], Value::Int(3));
        assert_eq!(snapshot, Snapshot::Leaf(Value::Int(3)));
        assert_eq!(snapshot.value_at(""), Some(&Value::Int(3)));
    }

    #[test]
    fn test_value_at_navigates_maps_and_lists() {
        let root = from_json(r#"{"Orders": [{"Id": 1}, {"Id": 2, "Note": null}]}"#).unwrap();
        assert_eq!(value_at(&root, &path("Orders[1].Id")).unwrap(), Some(Value::Int(2)));
        assert_eq!(value_at(&root, &path("orders[0].id")).unwrap(), None);
        assert_eq!(value_at(&root, &path("Orders[5].Id")).unwrap(), None);
        assert_eq!(value_at(&root, &path("Orders[1].Note")).unwrap(), None);
        assert_eq!(value_at(&root, &path("Orders.Id")).unwrap(), None);
    }

    #[test]
    fn test_value_at_ignore_case_prefers_exact_names() {
        let root = from_json(r#"{"Orders": [{"Id": 1}], "orders": [{"Id": 7}]}"#).unwrap();
        assert_eq!(
            value_at_ignore_case(&root, &path("orders[0].ID")).unwrap(),
            Some(Value::Int(7))
        );
        assert_eq!(
            value_at_ignore_case(&root, &path("ORDERS[0].id")).unwrap(),
            Some(Value::Int(1))
        );
        assert_eq!(value_at_ignore_case(&root, &path("Missing")).unwrap(), None);
    }

    #[test]
    fn test_change_builder_does_not_fold_case() {
        let old = from_json(r#"{"A": 1}"#).unwrap();
        let new = from_json(r#"{"a": 2}"#).unwrap();

        let record = ChangeBuilder::new(Some(&old), Some(&new))
            .build(&[difference("A"), difference("a")])
            .unwrap()
            .unwrap();

        assert_eq!(record.old_value.value_at("A"), Some(&Value::Int(1)));
        assert_eq!(record.old_value.value_at("a"), Some(&Value::Null));
        assert_eq!(record.new_value.value_at("A"), Some(&Value::Null));
        assert_eq!(record.new_value.value_at("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_change_builder_root_record() {
        let old = Value::Null;
        let record = ChangeBuilder::new(Some(&old), None).build_root().unwrap();
        assert_eq!(record.paths, vec![Path::new()]);
        assert_eq!(record.old_value, Snapshot::Leaf(Value::Null));
        assert_eq!(record.new_value, Snapshot::Leaf(Value::Null));
    }

    struct Locked;

    impl Diffable for Locked {
        fn shape(&self) -> Shape<'_> {
            Shape::Record(vec![FieldEntry::failed("Secret", FieldAccessError::new("denied"))])
        }
    }

    #[test]
    fn test_value_at_surfaces_field_access_errors() {
        let err = value_at(&Locked, &path("Secret")).unwrap_err();
        assert_eq!(err, DiffError::field_access("Secret", "denied"));

        let err = to_value(&Locked).unwrap_err();
        assert_eq!(err, DiffError::field_access("Secret", "denied"));
    }

    #[test]
    fn test_change_builder_refetches_from_roots() {
        let old = from_json(r#"{"Name": "Alice", "Address": {"Street": "Main", "City": "X"}}"#).unwrap();
        let new = from_json(r#"{"Name": "Alicia", "Address": {"Street": "Side", "City": "X"}}"#).unwrap();

        let record = ChangeBuilder::new(Some(&old), Some(&new))
            .build(&[difference("Name"), difference("Address.Street")])
            .unwrap()
            .unwrap();

        assert_eq!(record.old_value.value_at("Name"), Some(&Value::from("Alice")));
        assert_eq!(record.new_value.value_at("Name"), Some(&Value::from("Alicia")));
        assert_eq!(record.new_value.value_at("Address.Street"), Some(&Value::from("Side")));
        assert_eq!(record.new_value.value_at("Address.City"), None);
        assert_eq!(record.paths, vec![path("Name"), path("Address.Street")]);
    }

    #[test]
    fn test_change_builder_empty_is_none() {
        let value = Value::Int(1);
        assert!(ChangeBuilder::new(Some(&value), Some(&value))
            .build(&[])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_change_builder_absent_root() {
        let new = from_json(r#"{"Id": 1}"#).unwrap();
        let record = ChangeBuilder::new(None, Some(&new))
            .build(&[difference("")])
            .unwrap()
            .unwrap();
        assert_eq!(record.old_value, Snapshot::Leaf(Value::Null));
        assert_eq!(record.new_value, Snapshot::Leaf(new));
    }
}
