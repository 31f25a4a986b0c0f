//! Settings schema definitions.
//!
//! A [`SettingsSchema`] is the minimal description of a settings object that
//! the sources need: the declared field names, their defaults, which fields
//! hold structured values, and the [`SettingsConfig`] block that tells each
//! source where to look. Typing and validation of the resolved values are
//! left to serde.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::merge::MergePolicy;
use crate::value::normalize_key;

/// What happens to resolved keys that match no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraPolicy {
    /// Undeclared keys are an error.
    Forbid,
    /// Undeclared keys are kept in the resolved mapping.
    Allow,
    /// Undeclared keys are silently dropped.
    #[default]
    Ignore,
}

/// Per-schema source configuration.
///
/// Every field has a default, so a config block only needs to name what it
/// changes. `config_file` accepts a single path or a list of paths.
///
/// # Examples
///
/// ```
/// use strata::schema::{ExtraPolicy, SettingsConfig};
///
/// let config: SettingsConfig = serde_json::from_str(
///     r#"{"config_file": "app.toml", "extra": "allow"}"#,
/// ).unwrap();
/// assert_eq!(config.config_file.len(), 1);
/// assert_eq!(config.extra, ExtraPolicy::Allow);
/// assert!(config.config_merge);
/// assert!(!config.case_sensitive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    /// Config files to load, lowest precedence first.
    #[serde(deserialize_with = "one_or_many")]
    pub config_file: Vec<PathBuf>,

    /// Text encoding of the config files (UTF-8 when unset).
    pub config_file_encoding: Option<String>,

    /// Deep merge config files instead of overwriting top-level keys.
    pub config_merge: bool,

    /// Skip duplicate sequence elements when deep merging.
    pub config_merge_unique: bool,

    /// Match keys case-sensitively.
    pub case_sensitive: bool,

    /// Handling of keys that match no declared field.
    pub extra: ExtraPolicy,

    /// Prefix prepended to field names when reading environment variables.
    pub env_prefix: String,

    /// Dotenv file to read, if any.
    pub env_file: Option<PathBuf>,

    /// Text encoding of the dotenv file (UTF-8 when unset).
    pub env_file_encoding: Option<String>,

    /// Directory holding one file per secret value.
    pub secrets_dir: Option<PathBuf>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            config_file: Vec::new(),
            config_file_encoding: None,
            config_merge: true,
            config_merge_unique: true,
            case_sensitive: false,
            extra: ExtraPolicy::default(),
            env_prefix: String::new(),
            env_file: None,
            env_file_encoding: None,
            secrets_dir: None,
        }
    }
}

impl SettingsConfig {
    /// The merge policy described by `config_merge` and `config_merge_unique`.
    #[must_use]
    pub const fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            merge: self.config_merge,
            unique: self.config_merge_unique,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        One(PathBuf),
        Many(Vec<PathBuf>),
        None(()),
    }

    Ok(match Helper::deserialize(deserializer)? {
        Helper::One(path) => vec![path],
        Helper::Many(paths) => paths,
        Helper::None(()) => Vec::new(),
    })
}

/// A declared settings field.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata::schema::FieldSpec;
///
/// let field = FieldSpec::new("app")
///     .complex()
///     .default_value(json!({"name": "AppName"}));
/// assert_eq!(field.name(), "app");
/// assert!(field.is_complex());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    default: Option<Value>,
    complex: bool,
}

impl FieldSpec {
    /// Declares a field with no default that holds a plain scalar.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            complex: false,
        }
    }

    /// Marks the field as holding a structured value (mapping or sequence).
    ///
    /// String sources such as environment variables decode these as JSON.
    #[must_use]
    pub const fn complex(mut self) -> Self {
        self.complex = true;
        self
    }

    /// Sets the value used when no source supplies the field.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default value, if any.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns whether the field holds a structured value.
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        self.complex
    }
}

/// Declared fields plus source configuration.
///
/// # Examples
///
/// ```
/// use strata::schema::{FieldSpec, SettingsSchema};
///
/// let schema = SettingsSchema::builder()
///     .field(FieldSpec::new("app").complex())
///     .config_file("settings.toml")
///     .build()
///     .unwrap();
///
/// assert!(schema.is_declared("APP"));
/// assert_eq!(schema.config().config_file.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSchema {
    fields: Vec<FieldSpec>,
    config: SettingsConfig,
}

impl SettingsSchema {
    /// Creates a new schema builder.
    #[must_use]
    pub fn builder() -> SettingsSchemaBuilder {
        SettingsSchemaBuilder::default()
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the source configuration.
    #[must_use]
    pub const fn config(&self) -> &SettingsConfig {
        &self.config
    }

    /// Finds the declared field a key refers to, honoring case sensitivity.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        let case_sensitive = self.config.case_sensitive;
        let wanted = normalize_key(key, case_sensitive);
        self.fields
            .iter()
            .find(|field| normalize_key(field.name(), case_sensitive) == wanted)
    }

    /// Returns whether a key refers to a declared field.
    #[must_use]
    pub fn is_declared(&self, key: &str) -> bool {
        self.field(key).is_some()
    }
}

/// Builder for [`SettingsSchema`].
#[derive(Debug, Clone, Default)]
pub struct SettingsSchemaBuilder {
    fields: Vec<FieldSpec>,
    config: SettingsConfig,
}

impl SettingsSchemaBuilder {
    /// Declares a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Replaces the whole source configuration.
    #[must_use]
    pub fn config(mut self, config: SettingsConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends a config file (later files take precedence).
    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_file.push(path.into());
        self
    }

    /// Sets the config file encoding.
    #[must_use]
    pub fn config_file_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.config_file_encoding = Some(encoding.into());
        self
    }

    /// Enables or disables deep merging of config files.
    #[must_use]
    pub const fn config_merge(mut self, merge: bool) -> Self {
        self.config.config_merge = merge;
        self
    }

    /// Enables or disables sequence de-duplication while merging.
    #[must_use]
    pub const fn config_merge_unique(mut self, unique: bool) -> Self {
        self.config.config_merge_unique = unique;
        self
    }

    /// Sets case sensitivity for key matching.
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.config.case_sensitive = case_sensitive;
        self
    }

    /// Sets the extra field policy.
    #[must_use]
    pub const fn extra(mut self, extra: ExtraPolicy) -> Self {
        self.config.extra = extra;
        self
    }

    /// Sets the environment variable prefix.
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.env_prefix = prefix.into();
        self
    }

    /// Sets the dotenv file.
    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.env_file = Some(path.into());
        self
    }

    /// Sets the secrets directory.
    #[must_use]
    pub fn secrets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.secrets_dir = Some(path.into());
        self
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a field name is empty or two fields
    /// share a name (after case normalization when case-insensitive).
    pub fn build(self) -> Result<SettingsSchema> {
        let case_sensitive = self.config.case_sensitive;
        let mut seen = std::collections::HashSet::new();

        for field in &self.fields {
            if field.name().trim().is_empty() {
                return Err(Error::Validation {
                    field: field.name().to_string(),
                    message: "Field name cannot be empty".into(),
                });
            }
            if !seen.insert(normalize_key(field.name(), case_sensitive)) {
                return Err(Error::Validation {
                    field: field.name().to_string(),
                    message: "Field is declared more than once".into(),
                });
            }
        }

        Ok(SettingsSchema {
            fields: self.fields,
            config: self.config,
        })
    }
}
