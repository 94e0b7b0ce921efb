//! The traversal engine: walks two values side by side and records every
//! path whose values differ.

use super::align::{align_positional, Missing};
use super::change::{DifferenceKind, PropertyDifference};
use super::config::ComparisonConfig;
use super::error::{DiffError, DiffResult};
use super::snapshot::to_value_at;
use crate::fieldpath::{Path, PathElement, Rule};
use crate::value::{Diffable, FieldEntry, Shape, Value};
use indexmap::IndexMap;

/// Returns every difference between `old` and `new`, in traversal order.
pub fn differences(
    old: &dyn Diffable,
    new: &dyn Diffable,
    config: &ComparisonConfig,
) -> DiffResult<Vec<PropertyDifference>> {
    let mut traversal = Traversal::new(config);
    traversal.compare(old, new)?;
    Ok(traversal.differences)
}

/// Returns true if `old` and `new` differ anywhere outside of
/// always-included paths with equal values.
pub fn has_real_change(
    old: &dyn Diffable,
    new: &dyn Diffable,
    config: &ComparisonConfig,
) -> DiffResult<bool> {
    Ok(differences(old, new, config)?
        .iter()
        .any(PropertyDifference::is_real))
}

/// Traversal holds the state of one comparison call.
struct Traversal<'c> {
    config: &'c ComparisonConfig,
    path: Path,
    differences: Vec<PropertyDifference>,
    // Identities of the shared values on the current branch, per side.
    old_seen: Vec<usize>,
    new_seen: Vec<usize>,
}

impl<'c> Traversal<'c> {
    fn new(config: &'c ComparisonConfig) -> Self {
        Traversal {
            config,
            path: Path::new(),
            differences: Vec::new(),
            old_seen: Vec::new(),
            new_seen: Vec::new(),
        }
    }

    fn compare(&mut self, old: &dyn Diffable, new: &dyn Diffable) -> DiffResult<()> {
        let rule = self.config.matcher().rule(&self.path);
        if rule == Rule::Ignore {
            tracing::trace!(path = %self.path, "ignored");
            return Ok(());
        }

        let old_shape = old.shape();
        let new_shape = new.shape();

        match (old_shape.is_absent(), new_shape.is_absent()) {
            (true, true) => return Ok(()),
            _ if rule == Rule::AlwaysInclude => return self.record_always_included(old, new),
            (true, false) | (false, true) => return self.record(old, new, DifferenceKind::Changed),
            (false, false) => {}
        }

        let old_id = old.identity();
        let new_id = new.identity();
        let seen_old = old_id.is_some_and(|id| self.old_seen.contains(&id));
        let seen_new = new_id.is_some_and(|id| self.new_seen.contains(&id));
        if seen_old || seen_new {
            tracing::trace!(path = %self.path, "cycle detected, treating as unchanged");
            return Ok(());
        }

        if let Some(id) = old_id {
            self.old_seen.push(id);
        }
        if let Some(id) = new_id {
            self.new_seen.push(id);
        }
        let result = self.compare_shapes(old, new, old_shape, new_shape);
        if old_id.is_some() {
            self.old_seen.pop();
        }
        if new_id.is_some() {
            self.new_seen.pop();
        }
        result
    }

    fn compare_shapes(
        &mut self,
        old: &dyn Diffable,
        new: &dyn Diffable,
        old_shape: Shape<'_>,
        new_shape: Shape<'_>,
    ) -> DiffResult<()> {
        match (old_shape, new_shape) {
            (Shape::Leaf(a), Shape::Leaf(b)) => {
                if a != b {
                    self.push_difference(a, b, DifferenceKind::Changed);
                }
                Ok(())
            }
            (Shape::Sequence(a), Shape::Sequence(b)) => {
                for pair in align_positional(&a, &b) {
                    self.path.push(PathElement::Index(pair.key));
                    let result = if pair.old.is_none() || pair.new.is_none() {
                        self.compare_padded(pair.old_or_missing(), pair.new_or_missing())
                    } else {
                        self.compare(pair.old_or_missing(), pair.new_or_missing())
                    };
                    self.path.pop();
                    result?;
                }
                Ok(())
            }
            (Shape::Record(a), Shape::Record(b)) => {
                if !same_field_names(&a, &b) {
                    return Err(DiffError::type_mismatch(
                        &self.path,
                        describe_fields(&a),
                        describe_fields(&b),
                    ));
                }
                self.compare_fields(&a, &b)
            }
            (Shape::Map(a), Shape::Map(b)) => self.compare_fields(&a, &b),
            (a, b) => {
                if self.config.strict_shapes() || self.path.is_empty() {
                    return Err(DiffError::type_mismatch(
                        &self.path,
                        a.kind_name(),
                        b.kind_name(),
                    ));
                }
                self.record(old, new, DifferenceKind::Changed)
            }
        }
    }

    /// Walks the union of both field lists: old fields first, then fields
    /// found only on the new side.
    fn compare_fields(&mut self, old: &[FieldEntry<'_>], new: &[FieldEntry<'_>]) -> DiffResult<()> {
        let mut remaining: IndexMap<&str, &FieldEntry<'_>> =
            new.iter().map(|f| (&*f.name, f)).collect();

        for field in old {
            let counterpart = remaining.shift_remove(&*field.name);
            self.compare_field(&field.name, Some(field), counterpart)?;
        }
        for field in remaining.into_values() {
            self.compare_field(&field.name, None, Some(field))?;
        }
        Ok(())
    }

    fn compare_field(
        &mut self,
        name: &str,
        old: Option<&FieldEntry<'_>>,
        new: Option<&FieldEntry<'_>>,
    ) -> DiffResult<()> {
        self.path.push(PathElement::FieldName(name.to_string()));
        // Ignored fields are never read.
        if self.config.matcher().rule(&self.path) == Rule::Ignore {
            tracing::trace!(path = %self.path, "ignored");
            self.path.pop();
            return Ok(());
        }
        let result = match (read_field(old, &self.path), read_field(new, &self.path)) {
            (Ok(o), Ok(n)) => self.compare(o, n),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        self.path.pop();
        result
    }

    /// An index present on one side only is a change even when the element
    /// there is null.
    fn compare_padded(&mut self, old: &dyn Diffable, new: &dyn Diffable) -> DiffResult<()> {
        if self.config.matcher().rule(&self.path) == Rule::Ignore {
            tracing::trace!(path = %self.path, "ignored");
            return Ok(());
        }
        self.record(old, new, DifferenceKind::Changed)
    }

    fn record_always_included(&mut self, old: &dyn Diffable, new: &dyn Diffable) -> DiffResult<()> {
        let old_value = to_value_at(old, &mut self.path.clone())?;
        let new_value = to_value_at(new, &mut self.path.clone())?;
        let kind = if old_value == new_value {
            DifferenceKind::AlwaysIncluded
        } else {
            DifferenceKind::Changed
        };
        self.push_difference(old_value, new_value, kind);
        Ok(())
    }

    fn record(&mut self, old: &dyn Diffable, new: &dyn Diffable, kind: DifferenceKind) -> DiffResult<()> {
        let old_value = to_value_at(old, &mut self.path.clone())?;
        let new_value = to_value_at(new, &mut self.path.clone())?;
        self.push_difference(old_value, new_value, kind);
        Ok(())
    }

    fn push_difference(&mut self, old_value: Value, new_value: Value, kind: DifferenceKind) {
        let difference = PropertyDifference {
            path: self.path.clone(),
            old_value,
            new_value,
            kind,
        };
        tracing::trace!(%difference, "recorded difference");
        self.differences.push(difference);
    }
}

fn read_field<'a>(entry: Option<&FieldEntry<'a>>, path: &Path) -> DiffResult<&'a dyn Diffable> {
    match entry {
        None => Ok(&Missing),
        Some(FieldEntry { value: Ok(v), .. }) => Ok(*v),
        Some(FieldEntry { value: Err(e), .. }) => Err(DiffError::field_access(path, e.message.clone())),
    }
}

fn same_field_names(a: &[FieldEntry<'_>], b: &[FieldEntry<'_>]) -> bool {
    a.len() == b.len() && a.iter().all(|f| b.iter().any(|g| g.name == f.name))
}

fn describe_fields(fields: &[FieldEntry<'_>]) -> String {
    let names: Vec<&str> = fields.iter().map(|f| &*f.name).collect();
    format!("record {{{}}}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{from_json, FieldAccessError};
    use pretty_assertions::assert_eq;

    fn paths(diffs: &[PropertyDifference]) -> Vec<String> {
        diffs.iter().map(|d| d.path.to_string()).collect()
    }

    fn json(s: &str) -> Value {
        from_json(s).unwrap()
    }

    #[test]
    fn test_identical_values_have_no_differences() {
        let v = json(r#"{"a": [1, {"b": null}], "c": "x"}"#);
        assert!(differences(&v, &v, &ComparisonConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_map_union_order() {
        let old = json(r#"{"a": 1, "b": 2}"#);
        let new = json(r#"{"b": 3, "c": 4}"#);
        let diffs = differences(&old, &new, &ComparisonConfig::default()).unwrap();
        assert_eq!(paths(&diffs), vec!["a", "b", "c"]);
        assert_eq!(diffs[0].new_value, Value::Null);
        assert_eq!(diffs[2].old_value, Value::Null);
    }

    #[test]
    fn test_absent_side_is_not_descended() {
        let old = json(r#"{"Address": null}"#);
        let new = json(r#"{"Address": {"Street": "Main", "City": "X"}}"#);
        let diffs = differences(&old, &new, &ComparisonConfig::default()).unwrap();
        assert_eq!(paths(&diffs), vec!["Address"]);
        assert_eq!(diffs[0].new_value, json(r#"{"Street": "Main", "City": "X"}"#));
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let old = json(r#"{"Phones": ["1", "2"]}"#);
        let new = json(r#"{"Phones": ["1", "2", "3"]}"#);
        let diffs = differences(&old, &new, &ComparisonConfig::default()).unwrap();
        assert_eq!(paths(&diffs), vec!["Phones[2]"]);
    }

    #[test]
    fn test_padded_null_elements_are_differences() {
        let config = ComparisonConfig::default();
        let old = json(r#"{"Phones": ["1", null]}"#);
        let new = json(r#"{"Phones": ["1"]}"#);
        let diffs = differences(&old, &new, &config).unwrap();
        assert_eq!(paths(&diffs), vec!["Phones[1]"]);
        assert_eq!(diffs[0].old_value, Value::Null);
        assert!(diffs[0].is_real());

        let diffs = differences(&json("[null]"), &json("[]"), &config).unwrap();
        assert_eq!(paths(&diffs), vec!["[0]"]);

        let config = ComparisonConfig::builder().ignore("Phones[]").build().unwrap();
        assert!(differences(&old, &new, &config).unwrap().is_empty());
    }

    #[test]
    fn test_map_keys_differing_in_case_are_distinct() {
        let old = json(r#"{"A": 1}"#);
        let new = json(r#"{"a": 2}"#);
        let diffs = differences(&old, &new, &ComparisonConfig::default()).unwrap();
        assert_eq!(paths(&diffs), vec!["A", "a"]);
        assert_eq!(diffs[0].new_value, Value::Null);
        assert_eq!(diffs[1].old_value, Value::Null);
    }

    #[test]
    fn test_always_include_kind() {
        let config = ComparisonConfig::builder()
            .always_include_all(["Role", "Level"])
            .build()
            .unwrap();
        let old = json(r#"{"Role": "Admin", "Level": 1}"#);
        let new = json(r#"{"Role": "Admin", "Level": 2}"#);
        let diffs = differences(&old, &new, &config).unwrap();
        assert_eq!(paths(&diffs), vec!["Role", "Level"]);
        assert_eq!(diffs[0].kind, DifferenceKind::AlwaysIncluded);
        assert_eq!(diffs[1].kind, DifferenceKind::Changed);
        assert!(has_real_change(&old, &new, &config).unwrap());
    }

    #[test]
    fn test_always_include_does_not_descend() {
        let config = ComparisonConfig::builder().always_include("Address").build().unwrap();
        let old = json(r#"{"Address": {"Street": "Main"}}"#);
        let new = json(r#"{"Address": {"Street": "Side"}}"#);
        let diffs = differences(&old, &new, &config).unwrap();
        assert_eq!(paths(&diffs), vec!["Address"]);
        assert!(diffs[0].is_real());
    }

    #[test]
    fn test_ignored_path_is_not_descended() {
        let config = ComparisonConfig::builder()
            .ignore("Address")
            .always_include("Street")
            .build()
            .unwrap();
        let old = json(r#"{"Address": {"Street": "Main"}}"#);
        let new = json(r#"{"Address": "gone"}"#);
        assert!(differences(&old, &new, &config).unwrap().is_empty());
    }

    #[test]
    fn test_kind_mismatch_strict_and_lenient() {
        let old = json(r#"{"Tags": ["a"]}"#);
        let new = json(r#"{"Tags": {"a": true}}"#);

        let err = differences(&old, &new, &ComparisonConfig::default()).unwrap_err();
        assert_eq!(err, DiffError::type_mismatch("Tags", "sequence", "map"));

        let lenient = ComparisonConfig::builder().strict_shapes(false).build().unwrap();
        let diffs = differences(&old, &new, &lenient).unwrap();
        assert_eq!(paths(&diffs), vec!["Tags"]);
    }

    #[test]
    fn test_root_kind_mismatch_always_fails() {
        let lenient = ComparisonConfig::builder().strict_shapes(false).build().unwrap();
        let err = differences(&json("[1]"), &json("1"), &lenient).unwrap_err();
        assert!(matches!(err, DiffError::TypeMismatch { .. }));
    }

    struct Flaky {
        broken: bool,
    }

    impl Diffable for Flaky {
        fn shape(&self) -> Shape<'_> {
            if self.broken {
                Shape::Record(vec![FieldEntry::failed("Value", FieldAccessError::new("getter panicked"))])
            } else {
                Shape::Record(vec![FieldEntry::new("Value", &1i32)])
            }
        }
    }

    #[test]
    fn test_field_access_error_is_surfaced() {
        let err = differences(
            &Flaky { broken: false },
            &Flaky { broken: true },
            &ComparisonConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, DiffError::field_access("Value", "getter panicked"));
    }
}
