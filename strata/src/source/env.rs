//! Environment variable source.
//!
//! A field `name` is read from the variable `{env_prefix}{name}`. Unless the
//! schema is case-sensitive, variable names are matched case-insensitively.
//! Plain fields receive the variable's string value; complex fields decode it
//! as JSON.

use std::collections::HashMap;
use std::env;

use serde_json::Value;

use crate::error::Result;
use crate::schema::{FieldSpec, SettingsSchema};
use crate::source::{decode_complex, FieldValue, SettingsSource};
use crate::value::normalize_key;

/// A snapshot of environment-style variables.
///
/// # Examples
///
/// ```
/// use strata::schema::{FieldSpec, SettingsSchema};
/// use strata::source::{EnvSource, SettingsSource};
///
/// let schema = SettingsSchema::builder()
///     .field(FieldSpec::new("level"))
///     .env_prefix("APP_")
///     .build()
///     .unwrap();
/// let source = EnvSource::from_vars(&schema, [("app_level", "debug")]);
/// let values = source.resolve_all(&schema).unwrap();
/// assert_eq!(values["level"], "debug");
/// ```
#[derive(Debug, Clone)]
pub struct EnvSource {
    vars: HashMap<String, String>,
    prefix: String,
    case_sensitive: bool,
}

impl EnvSource {
    /// Snapshot the process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    #[must_use]
    pub fn new(schema: &SettingsSchema) -> Self {
        let vars = env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::from_vars(schema, vars)
    }

    /// Build a source from explicit name/value pairs.
    pub fn from_vars<I, K, V>(schema: &SettingsSchema, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config = schema.config();
        let case_sensitive = config.case_sensitive;
        let vars = vars
            .into_iter()
            .map(|(key, value)| {
                let key: String = key.into();
                (normalize_key(&key, case_sensitive), value.into())
            })
            .collect();

        Self {
            vars,
            prefix: config.env_prefix.clone(),
            case_sensitive,
        }
    }

    fn var_name(&self, field: &FieldSpec) -> String {
        normalize_key(&format!("{}{}", self.prefix, field.name()), self.case_sensitive)
    }
}

impl SettingsSource for EnvSource {
    fn name(&self) -> &'static str {
        "env"
    }

    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
        let key = self.var_name(field);
        Ok(FieldValue {
            value: self.vars.get(&key).cloned().map(Value::String),
            key,
            is_complex: field.is_complex(),
        })
    }

    fn prepare_field_value(
        &self,
        field: &FieldSpec,
        value: Option<Value>,
        is_complex: bool,
    ) -> Result<Option<Value>> {
        if is_complex {
            decode_complex(&self.var_name(field), value)
        } else {
            Ok(value)
        }
    }
}
