//! The raw mapping type shared by readers, the merge engine and sources.
//!
//! A raw mapping is untyped: string keys to JSON-like values, nested to any
//! depth. Readers for every format produce one, and nothing downstream knows
//! which format a value originally came from.

use serde_json::Value;

/// A nested, string-keyed configuration mapping.
pub type Mapping = serde_json::Map<String, Value>;

/// Returns a copy of `mapping` with every key lowercased, recursively.
///
/// Mappings nested inside sequences are normalized as well, so no level of
/// the structure keeps its original casing.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata::value::lowercase_keys;
///
/// let mapping = json!({"App": {"Name": "x", "Hosts": [{"Addr": "a"}]}});
/// let lowered = lowercase_keys(mapping.as_object().unwrap());
/// assert_eq!(
///     serde_json::Value::Object(lowered),
///     json!({"app": {"name": "x", "hosts": [{"addr": "a"}]}})
/// );
/// ```
#[must_use]
pub fn lowercase_keys(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .map(|(key, value)| (key.to_lowercase(), lowercase_value(value)))
        .collect()
}

fn lowercase_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(lowercase_keys(map)),
        Value::Array(items) => Value::Array(items.iter().map(lowercase_value).collect()),
        other => other.clone(),
    }
}

/// Normalizes a lookup key according to the case sensitivity flag.
#[must_use]
pub fn normalize_key(key: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        key.to_string()
    } else {
        key.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Mapping {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lowercase_top_level() {
        let lowered = lowercase_keys(&obj(json!({"APP": 1, "Debug": true})));
        assert_eq!(lowered, obj(json!({"app": 1, "debug": true})));
    }

    #[test]
    fn test_lowercase_nested() {
        let lowered = lowercase_keys(&obj(json!({"App": {"DESCRIPTION": "x"}})));
        assert_eq!(lowered, obj(json!({"app": {"description": "x"}})));
    }

    #[test]
    fn test_lowercase_inside_sequences() {
        let lowered = lowercase_keys(&obj(json!({"Servers": [{"Host": "a"}, "Plain"]})));
        assert_eq!(lowered, obj(json!({"servers": [{"host": "a"}, "Plain"]})));
    }

    #[test]
    fn test_values_keep_their_case() {
        let lowered = lowercase_keys(&obj(json!({"Name": "MixedCase"})));
        assert_eq!(lowered["name"], json!("MixedCase"));
    }

    #[test]
    fn test_colliding_keys_last_in_file_order_wins() {
        let lowered = lowercase_keys(&obj(json!({"b": 1, "B": 2})));
        assert_eq!(lowered.len(), 1);
        assert_eq!(lowered["b"], json!(2));
    }

    #[test]
    fn test_key_order_preserved() {
        let lowered = lowercase_keys(&obj(json!({"Zeta": 1, "alpha": 2, "Mid": 3})));
        let keys: Vec<&str> = lowered.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("App", true), "App");
        assert_eq!(normalize_key("App", false), "app");
    }
}
