//! Property-based tests for merging and key normalization.

use crate::merge::{deep_merge, deep_update, merge_all, shallow_merge, MergePolicy};
use crate::value::{lowercase_keys, Mapping};
use proptest::prelude::*;
use serde_json::Value;

// Scalars only; floats are left out so equality stays total.
fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,4}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn mapping_strategy() -> impl Strategy<Value = Mapping> {
    prop::collection::btree_map("[a-zA-Z]{1,4}", value_strategy(), 0..5)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1000,
        .. ProptestConfig::default()
    })]

    // The empty mapping is an identity on both sides
    #[test]
    fn deep_merge_empty_is_identity(m in mapping_strategy(), unique in any::<bool>()) {
        let empty = Mapping::new();
        prop_assert_eq!(deep_merge(&m, &empty, unique), m.clone());
        prop_assert_eq!(deep_merge(&empty, &m, unique), m);
    }

    // Merging a mapping with itself changes nothing when duplicates are skipped
    #[test]
    fn deep_merge_unique_is_idempotent(m in mapping_strategy()) {
        prop_assert_eq!(deep_merge(&m, &m, true), m);
    }

    // Every key of either side survives a merge
    #[test]
    fn merge_keeps_all_top_level_keys(
        base in mapping_strategy(),
        incoming in mapping_strategy(),
        merge in any::<bool>(),
        unique in any::<bool>()
    ) {
        let result = MergePolicy { merge, unique }.apply(&base, &incoming);
        for key in base.keys().chain(incoming.keys()) {
            prop_assert!(result.contains_key(key));
        }
        prop_assert!(result.len() <= base.len() + incoming.len());
    }

    // Shallow merge takes every incoming top-level value verbatim
    #[test]
    fn shallow_merge_incoming_wins(base in mapping_strategy(), incoming in mapping_strategy()) {
        let result = shallow_merge(&base, &incoming);
        for (key, value) in &incoming {
            prop_assert_eq!(&result[key], value);
        }
        for (key, value) in &base {
            if !incoming.contains_key(key) {
                prop_assert_eq!(&result[key], value);
            }
        }
    }

    // Incoming scalars always replace whatever the base held
    #[test]
    fn deep_merge_incoming_scalars_win(
        base in mapping_strategy(),
        incoming in mapping_strategy(),
        unique in any::<bool>()
    ) {
        let result = deep_merge(&base, &incoming, unique);
        for (key, value) in &incoming {
            if !value.is_object() && !value.is_array() {
                prop_assert_eq!(&result[key], value);
            }
        }
    }

    // Without uniqueness, merged sequences are exactly base followed by incoming
    #[test]
    fn deep_merge_concatenates_sequences(
        key in "[a-z]{1,4}",
        left in prop::collection::vec(leaf_strategy(), 0..6),
        right in prop::collection::vec(leaf_strategy(), 0..6)
    ) {
        let mut base = Mapping::new();
        base.insert(key.clone(), Value::Array(left.clone()));
        let mut incoming = Mapping::new();
        incoming.insert(key.clone(), Value::Array(right.clone()));

        let expected: Vec<Value> = left.iter().chain(right.iter()).cloned().collect();
        prop_assert_eq!(&deep_merge(&base, &incoming, false)[&key], &Value::Array(expected));

        let unique = deep_merge(&base, &incoming, true);
        let merged = unique[&key].as_array().cloned().unwrap_or_default();
        prop_assert_eq!(&merged[..left.len()], &left[..]);
        for item in &merged[left.len()..] {
            prop_assert!(!left.contains(item));
        }
    }

    // merge_all is a left fold of deep_merge
    #[test]
    fn merge_all_matches_fold(
        maps in prop::collection::vec(mapping_strategy(), 0..4),
        unique in any::<bool>()
    ) {
        let folded = maps
            .iter()
            .fold(Mapping::new(), |acc, next| deep_merge(&acc, next, unique));
        prop_assert_eq!(merge_all(&maps, unique), folded);
    }

    // Inputs are never modified
    #[test]
    fn merge_does_not_mutate_inputs(base in mapping_strategy(), incoming in mapping_strategy()) {
        let base_before = base.clone();
        let incoming_before = incoming.clone();
        let _ = deep_merge(&base, &incoming, true);
        let _ = deep_update(&base, &incoming);
        prop_assert_eq!(base, base_before);
        prop_assert_eq!(incoming, incoming_before);
    }

    // deep_update with itself is a no-op
    #[test]
    fn deep_update_self_is_identity(m in mapping_strategy()) {
        prop_assert_eq!(deep_update(&m, &m), m);
    }

    // Lowercasing twice is the same as lowercasing once
    #[test]
    fn lowercase_keys_is_idempotent(m in mapping_strategy()) {
        let once = lowercase_keys(&m);
        prop_assert_eq!(lowercase_keys(&once), once.clone());
        prop_assert!(once.keys().all(|key| key.chars().all(|c| !c.is_uppercase())));
    }
}
