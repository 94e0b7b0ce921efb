//! Scenario tests for collection comparisons.

#[cfg(test)]
mod tests {
    use crate::diff::{
        compare_lists, compare_lists_keyed, value_at, ChangeKind, ComparisonConfig, DiffError,
        ItemKey, KeySelector, Side,
    };
    use crate::diffable_record;
    use crate::fieldpath::Path;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[derive(Clone)]
    struct Order {
        id: u32,
        customer: String,
        status: String,
        lines: Vec<String>,
    }

    diffable_record!(Order {
        "Id" => id,
        "Customer" => customer,
        "Status" => status,
        "Lines" => lines,
    });

    fn order(id: u32, status: &str) -> Order {
        Order {
            id,
            customer: format!("customer-{}", id),
            status: status.into(),
            lines: vec!["widget".into()],
        }
    }

    fn keyed_config() -> ComparisonConfig {
        ComparisonConfig::builder().key_path("Id").build().unwrap()
    }

    fn summary(changes: &crate::diff::ChangeSet) -> Vec<(String, ChangeKind)> {
        changes
            .iter()
            .map(|item| (item.key.to_string(), item.kind))
            .collect()
    }

    #[test]
    fn test_keyed_classification() {
        let old = vec![order(2, "open"), order(3, "open"), order(5, "open")];
        let new = vec![order(5, "open"), order(3, "shipped"), order(1, "open")];

        let changes = compare_lists(&old, &new, Some(&keyed_config())).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("2".to_string(), ChangeKind::Removed),
                ("3".to_string(), ChangeKind::Modified),
                ("1".to_string(), ChangeKind::Added),
            ]
        );

        let modified = changes.get(&ItemKey::Key(Value::Int(3))).unwrap();
        assert_eq!(modified.record.paths, vec![Path::parse("Status").unwrap()]);
        assert_eq!(
            modified.record.new_value.value_at("Status"),
            Some(&Value::from("shipped"))
        );

        let added = changes.added().next().unwrap();
        assert_eq!(
            added.record.new_value.to_value().as_map().and_then(|m| m.get("Customer")),
            Some(&Value::from("customer-1"))
        );
        assert_eq!(added.record.old_value.value_at(""), Some(&Value::Null));
    }

    #[test]
    fn test_keyed_ignores_reordering() {
        let old = vec![order(1, "open"), order(2, "open")];
        let new = vec![order(2, "open"), order(1, "open")];
        assert!(compare_lists(&old, &new, Some(&keyed_config())).unwrap().is_empty());
    }

    #[test]
    fn test_keyed_always_included_only_rides_along() {
        let config = ComparisonConfig::builder()
            .key_path("Id")
            .always_include("Customer")
            .build()
            .unwrap();
        let old = vec![order(1, "open"), order(2, "open")];
        let new = vec![order(1, "open"), order(2, "closed")];

        let changes = compare_lists(&old, &new, Some(&config)).unwrap();
        assert_eq!(summary(&changes), vec![("2".to_string(), ChangeKind::Modified)]);
        let record = &changes.items[0].record;
        assert!(record.contains("Customer"));
        assert!(record.contains("Status"));
    }

    #[test]
    fn test_keyed_with_closure_selector() {
        let selector = KeySelector::from_fn(|item| {
            let path = Path::parse("Customer").ok()?;
            value_at(item, &path).ok().flatten()
        });
        let config = ComparisonConfig::builder().key_selector(selector).build().unwrap();

        let old = vec![order(1, "open")];
        let new = vec![order(2, "open")];
        let changes = compare_lists_keyed(&old, &new, &config).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("\"customer-1\"".to_string(), ChangeKind::Removed),
                ("\"customer-2\"".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let old = vec![order(1, "open"), order(1, "closed")];
        let err = compare_lists(&old, &[], Some(&keyed_config())).unwrap_err();
        assert_eq!(err, DiffError::duplicate_key(Side::Old, 1));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_keyed_without_selector_is_rejected() {
        let old = vec![order(1, "open")];
        let err = compare_lists_keyed(&old, &old, &ComparisonConfig::default()).unwrap_err();
        assert!(matches!(err, DiffError::Configuration { .. }));
    }

    #[test]
    fn test_positional_pads_and_classifies() {
        let old = vec![order(1, "open"), order(2, "open")];
        let new = vec![order(1, "closed"), order(2, "open"), order(3, "open")];

        let changes = compare_lists(&old, &new, None).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("[0]".to_string(), ChangeKind::Modified),
                ("[2]".to_string(), ChangeKind::Added),
            ]
        );
        assert_eq!(changes.old_values().count(), 2);
        assert_eq!(changes.to_string(), "~ [0]\n    Status\n+ [2]");
    }

    #[test]
    fn test_positional_shrinks() {
        let old = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        let new = vec![Value::Int(1)];
        let changes = compare_lists(&old, &new, None).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("[1]".to_string(), ChangeKind::Removed),
                ("[2]".to_string(), ChangeKind::Removed),
            ]
        );
        assert_eq!(
            changes.old_values().cloned().collect::<Vec<_>>(),
            vec![
                crate::diff::Snapshot::Leaf(Value::Int(2)),
                crate::diff::Snapshot::Leaf(Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_positional_removed_none_item() {
        let changes = compare_lists(&[Some(1), None], &[Some(1)], None).unwrap();
        assert_eq!(summary(&changes), vec![("[1]".to_string(), ChangeKind::Removed)]);

        let removed = &changes.items[0].record;
        assert_eq!(removed.paths, vec![Path::new()]);
        assert_eq!(removed.old_value, crate::diff::Snapshot::Leaf(Value::Null));
        assert_eq!(removed.new_value, crate::diff::Snapshot::Leaf(Value::Null));

        let changes = compare_lists(&[Some(1)], &[Some(1), None], None).unwrap();
        assert_eq!(summary(&changes), vec![("[1]".to_string(), ChangeKind::Added)]);
    }

    #[test]
    fn test_keyed_selector_falls_back_to_other_case() {
        let config = ComparisonConfig::builder().key_path("ID").build().unwrap();
        let old = vec![order(1, "open")];
        let new = vec![order(1, "closed")];
        let changes = compare_lists(&old, &new, Some(&config)).unwrap();
        assert_eq!(summary(&changes), vec![("1".to_string(), ChangeKind::Modified)]);
    }

    #[test]
    fn test_positional_ignored_fields() {
        let config = ComparisonConfig::builder().ignore("Status").build().unwrap();
        let old = vec![order(1, "open")];
        let new = vec![order(1, "closed")];
        assert!(compare_lists(&old, &new, Some(&config)).unwrap().is_empty());
    }
}
