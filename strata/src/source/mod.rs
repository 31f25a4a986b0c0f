//! Settings sources.
//!
//! A source answers "what value do you have for this field?" for every
//! declared field, and may contribute undeclared keys of its own. The
//! [`SettingsPipeline`](crate::pipeline::SettingsPipeline) composes sources
//! in precedence order.

pub mod config_file;
pub mod dotenv;
pub mod env;
pub mod init;
pub mod secrets;

pub use config_file::{ConfigFileSource, ConfigFileSourceBuilder};
pub use dotenv::DotEnvSource;
pub use env::EnvSource;
pub use init::InitSource;
pub use secrets::SecretsSource;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{FieldSpec, SettingsSchema};
use crate::value::Mapping;

/// The raw answer of a source for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    /// The value found, `None` when the source has nothing for the field.
    pub value: Option<Value>,
    /// The key the source looked the value up under.
    pub key: String,
    /// Whether the value still needs structured decoding.
    pub is_complex: bool,
}

impl FieldValue {
    /// A lookup that found nothing.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self {
            value: None,
            key: key.into(),
            is_complex: false,
        }
    }
}

/// A provider of raw settings values.
///
/// Sources are read-only once constructed. All I/O happens in the
/// constructor, so the query methods only fail on malformed values.
pub trait SettingsSource: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Look up the raw value for a declared field.
    ///
    /// # Errors
    ///
    /// Returns an error if the source holds a value it cannot represent.
    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue>;

    /// Post-process a looked-up value before it is collected.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be decoded.
    fn prepare_field_value(
        &self,
        field: &FieldSpec,
        value: Option<Value>,
        is_complex: bool,
    ) -> Result<Option<Value>> {
        let _ = (field, is_complex);
        Ok(value)
    }

    /// Everything this source contributes, keyed by field name.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while looking up or preparing a field.
    fn resolve_all(&self, schema: &SettingsSchema) -> Result<Mapping> {
        collect_declared(self, schema)
    }
}

/// Collect the prepared values of every declared field a source has.
///
/// Fields the source has no value for are left out.
///
/// # Errors
///
/// Returns the first lookup or preparation error.
pub fn collect_declared<S>(source: &S, schema: &SettingsSchema) -> Result<Mapping>
where
    S: SettingsSource + ?Sized,
{
    let mut data = Mapping::new();
    for field in schema.fields() {
        let found = source.field_value(field)?;
        if let Some(value) = source.prepare_field_value(field, found.value, found.is_complex)? {
            log::trace!("{} source supplied '{}' via '{}'", source.name(), field.name(), found.key);
            data.insert(field.name().to_string(), value);
        }
    }
    Ok(data)
}

/// Decode a string value as JSON for a structured field.
fn decode_complex(key: &str, raw: Option<Value>) -> Result<Option<Value>> {
    match raw {
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Validation {
                field: key.to_string(),
                message: format!("expected a JSON value: {e}"),
            }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Mapping);

    impl SettingsSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
            Ok(FieldValue {
                value: self.0.get(field.name()).cloned(),
                key: field.name().to_string(),
                is_complex: field.is_complex(),
            })
        }
    }

    #[test]
    fn test_collect_declared_skips_missing() {
        let schema = SettingsSchema::builder()
            .field(FieldSpec::new("a"))
            .field(FieldSpec::new("b"))
            .build()
            .unwrap();
        let mut values = Mapping::new();
        values.insert("a".into(), json!(1));
        values.insert("undeclared".into(), json!(2));

        let data = Fixed(values).resolve_all(&schema).unwrap();
        assert_eq!(Value::Object(data), json!({"a": 1}));
    }

    #[test]
    fn test_decode_complex() {
        let decoded = decode_complex("APP", Some(json!(r#"{"name": "x"}"#))).unwrap();
        assert_eq!(decoded, Some(json!({"name": "x"})));

        assert_eq!(decode_complex("APP", None).unwrap(), None);

        let err = decode_complex("APP", Some(json!("{broken"))).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "APP"));
    }

    #[test]
    fn test_missing_field_value() {
        let missing = FieldValue::missing("key");
        assert!(missing.value.is_none());
        assert_eq!(missing.key, "key");
    }
}
