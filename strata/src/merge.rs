//! Deep merging of raw configuration mappings.
//!
//! Config files are folded together left to right, so a file later in the
//! list takes precedence over an earlier one:
//!
//! - Mappings: merged recursively, key by key
//! - Sequences: base elements first, then the incoming elements (optionally
//!   only those the base does not already contain)
//! - Anything else, including mismatched shapes: the incoming value wins
//!
//! Inputs are only ever borrowed. Every function here returns a freshly owned
//! mapping that shares nothing with its arguments.

use serde_json::Value;

use crate::value::Mapping;

/// How the results of several config files are combined.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata::merge::MergePolicy;
///
/// let first = json!({"app": {"name": "A"}});
/// let second = json!({"app": {"desc": "D"}});
///
/// let deep = MergePolicy::default()
///     .apply(first.as_object().unwrap(), second.as_object().unwrap());
/// assert_eq!(serde_json::Value::Object(deep), json!({"app": {"name": "A", "desc": "D"}}));
///
/// let shallow = MergePolicy { merge: false, unique: true }
///     .apply(first.as_object().unwrap(), second.as_object().unwrap());
/// assert_eq!(serde_json::Value::Object(shallow), json!({"app": {"desc": "D"}}));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Deep merge file results; when false, later files overwrite whole
    /// top-level values.
    pub merge: bool,
    /// When deep merging sequences, skip incoming elements already present.
    /// Has no effect when `merge` is false.
    pub unique: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            merge: true,
            unique: true,
        }
    }
}

impl MergePolicy {
    /// Fold `incoming` into `acc` according to this policy.
    #[must_use]
    pub fn apply(&self, acc: &Mapping, incoming: &Mapping) -> Mapping {
        if self.merge {
            deep_merge(acc, incoming, self.unique)
        } else {
            shallow_merge(acc, incoming)
        }
    }
}

/// Deep merge `incoming` into a copy of `base`.
///
/// For each key of `incoming`:
///
/// - both values are mappings: merged recursively with the same `unique` flag
/// - both values are sequences: `base` elements followed by the `incoming`
///   ones; with `unique`, incoming elements equal to some base element are
///   skipped
/// - otherwise the incoming value replaces the base value
///
/// Keys that only exist in `base` are kept as they are. The `unique` flag
/// applies at every depth: with `unique = false`, nested sequences keep
/// their duplicates as well.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata::merge::deep_merge;
///
/// let base = json!({"x": [1, 2]});
/// let incoming = json!({"x": [2, 3]});
///
/// let unique = deep_merge(base.as_object().unwrap(), incoming.as_object().unwrap(), true);
/// assert_eq!(unique["x"], json!([1, 2, 3]));
///
/// let all = deep_merge(base.as_object().unwrap(), incoming.as_object().unwrap(), false);
/// assert_eq!(all["x"], json!([1, 2, 2, 3]));
/// ```
#[must_use]
pub fn deep_merge(base: &Mapping, incoming: &Mapping, unique: bool) -> Mapping {
    let mut result = base.clone();

    for (key, value) in incoming {
        let merged = match (result.get(key), value) {
            (Some(Value::Object(base_map)), Value::Object(incoming_map)) => {
                Value::Object(deep_merge(base_map, incoming_map, unique))
            }
            (Some(Value::Array(base_items)), Value::Array(incoming_items)) => {
                Value::Array(merge_sequences(base_items, incoming_items, unique))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }

    result
}

// Values are not hashable, so the uniqueness filter is a linear scan of the
// base sequence per incoming element.
fn merge_sequences(base: &[Value], incoming: &[Value], unique: bool) -> Vec<Value> {
    let mut merged = base.to_vec();
    if unique {
        merged.extend(incoming.iter().filter(|item| !base.contains(item)).cloned());
    } else {
        merged.extend_from_slice(incoming);
    }
    merged
}

/// Merge multiple mappings in order, with later mappings taking precedence.
///
/// Equivalent to folding [`deep_merge`] over the list from an empty mapping.
#[must_use]
pub fn merge_all<'a>(mappings: impl IntoIterator<Item = &'a Mapping>, unique: bool) -> Mapping {
    mappings
        .into_iter()
        .fold(Mapping::new(), |acc, next| deep_merge(&acc, next, unique))
}

/// Replace whole top-level values of `base` with those of `incoming`.
///
/// Nested structure at a shared key is discarded entirely.
#[must_use]
pub fn shallow_merge(base: &Mapping, incoming: &Mapping) -> Mapping {
    let mut result = base.clone();
    for (key, value) in incoming {
        result.insert(key.clone(), value.clone());
    }
    result
}

/// Overlay `incoming` onto `base` the way settings sources are composed.
///
/// Nested mappings are updated recursively; any other value, sequences
/// included, is replaced outright.
#[must_use]
pub fn deep_update(base: &Mapping, incoming: &Mapping) -> Mapping {
    let mut result = base.clone();

    for (key, value) in incoming {
        let updated = match (result.get(key), value) {
            (Some(Value::Object(base_map)), Value::Object(incoming_map)) => {
                Value::Object(deep_update(base_map, incoming_map))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), updated);
    }

    result
}
