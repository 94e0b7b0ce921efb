//! Property-based tests for the comparison engine.

use proptest::prelude::*;
use sparse_diff::value::Map;
use sparse_diff::{compare_objects, ComparisonConfig, PathElement, Snapshot, Value};
use std::collections::BTreeSet;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-100i64..100).prop_map(Value::Int),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![Just("Secret".to_string()), "[a-c]{1,2}"]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map(key(), inner, 0..4)
                .prop_map(|fields| Value::Map(Map { fields })),
        ]
    })
}

fn document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(key(), value(), 0..5).prop_map(|fields| Value::Map(Map { fields }))
}

fn lenient() -> ComparisonConfig {
    ComparisonConfig::builder().strict_shapes(false).build().unwrap()
}

fn path_set(old: &Value, new: &Value, config: &ComparisonConfig) -> BTreeSet<String> {
    compare_objects(old, new, Some(config))
        .unwrap()
        .map(|record| record.paths.iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn comparing_a_value_with_itself_finds_nothing(v in value()) {
        prop_assert!(compare_objects(&v, &v.clone(), None).unwrap().is_none());
    }

    #[test]
    fn ignored_fields_never_surface(old in document(), new in document()) {
        let config = ComparisonConfig::builder()
            .ignore("secret")
            .strict_shapes(false)
            .build()
            .unwrap();
        if let Some(record) = compare_objects(&old, &new, Some(&config)).unwrap() {
            for path in &record.paths {
                let hidden = path.iter().any(|e| {
                    matches!(e, PathElement::FieldName(name) if name.eq_ignore_ascii_case("secret"))
                });
                prop_assert!(!hidden, "ignored path {} surfaced", path);
            }
        }
    }

    #[test]
    fn difference_paths_are_symmetric(old in document(), new in document()) {
        let config = lenient();
        prop_assert_eq!(path_set(&old, &new, &config), path_set(&new, &old, &config));
    }

    #[test]
    fn snapshots_hold_the_compared_values(old in document(), new in document()) {
        if let Some(record) = compare_objects(&old, &new, Some(&lenient())).unwrap() {
            let mut seen = BTreeSet::new();
            for path in &record.paths {
                prop_assert!(seen.insert(path.to_string()), "duplicate path {}", path);
                let current = sparse_diff::diff::value_at(&new, path).unwrap().unwrap_or_default();
                let expected = Snapshot::Leaf(current);
                prop_assert_eq!(record.new_value.get(path), Some(&expected));
            }
        }
    }
}
