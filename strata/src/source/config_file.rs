//! Config file settings source.
//!
//! Wraps the [`ConfigLoader`]: files are read and merged once at
//! construction, keys are lowercased when the schema is case-insensitive,
//! and the result is cached for every later query. Besides the declared
//! fields, every non-null top-level entry that no declared field claims is
//! contributed as an extra; whether extras survive is up to the schema's
//! extra policy.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::Result;
use crate::loader::ConfigLoader;
use crate::merge::MergePolicy;
use crate::readers::ReaderRegistry;
use crate::schema::{FieldSpec, SettingsSchema};
use crate::source::{collect_declared, FieldValue, SettingsSource};
use crate::value::{lowercase_keys, normalize_key, Mapping};

/// Settings read from one or more config files.
///
/// # Examples
///
/// ```no_run
/// use strata::schema::{FieldSpec, SettingsSchema};
/// use strata::source::{ConfigFileSource, SettingsSource};
///
/// let schema = SettingsSchema::builder()
///     .field(FieldSpec::new("app").complex())
///     .config_file("settings.toml")
///     .config_file("~/.config/app/local.yaml")
///     .build()
///     .unwrap();
///
/// let source = ConfigFileSource::new(&schema).unwrap();
/// let values = source.resolve_all(&schema).unwrap();
/// println!("app = {}", values["app"]);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigFileSource {
    values: Mapping,
    case_sensitive: bool,
}

impl ConfigFileSource {
    /// Load the files named by the schema's config.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving or reading the files.
    pub fn new(schema: &SettingsSchema) -> Result<Self> {
        Self::builder(schema).build()
    }

    /// Start a builder whose settings default to the schema's config.
    #[must_use]
    pub fn builder(schema: &SettingsSchema) -> ConfigFileSourceBuilder<'_> {
        ConfigFileSourceBuilder {
            schema,
            registry: None,
            files: None,
            encoding: None,
            merge: None,
            unique: None,
            case_sensitive: None,
        }
    }

    /// Returns the merged, normalized file contents.
    #[must_use]
    pub const fn values(&self) -> &Mapping {
        &self.values
    }

    /// Returns a top-level entry, matching the key as the source's case
    /// sensitivity dictates. Null entries count as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.present(key)
            .or_else(|| self.present(&normalize_key(key, self.case_sensitive)))
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }
}

impl SettingsSource for ConfigFileSource {
    fn name(&self) -> &'static str {
        "config_file"
    }

    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
        Ok(FieldValue {
            value: self.present(field.name()).cloned(),
            key: field.name().to_string(),
            is_complex: false,
        })
    }

    fn prepare_field_value(
        &self,
        field: &FieldSpec,
        value: Option<Value>,
        _is_complex: bool,
    ) -> Result<Option<Value>> {
        match value {
            Some(value) if !value.is_null() => Ok(Some(value)),
            _ => Ok(self.get(field.name()).cloned()),
        }
    }

    fn resolve_all(&self, schema: &SettingsSchema) -> Result<Mapping> {
        let mut data = collect_declared(self, schema)?;

        let claimed: Vec<String> = data
            .keys()
            .map(|key| normalize_key(key, self.case_sensitive))
            .collect();

        for (key, value) in &self.values {
            if value.is_null() || claimed.contains(&normalize_key(key, self.case_sensitive)) {
                continue;
            }
            log::trace!("config file supplies extra key '{key}'");
            data.insert(key.clone(), value.clone());
        }

        Ok(data)
    }
}

/// Builder for [`ConfigFileSource`].
///
/// Every setting left unset falls back to the schema's
/// [`SettingsConfig`](crate::schema::SettingsConfig).
#[derive(Debug)]
pub struct ConfigFileSourceBuilder<'a> {
    schema: &'a SettingsSchema,
    registry: Option<&'a ReaderRegistry>,
    files: Option<Vec<PathBuf>>,
    encoding: Option<String>,
    merge: Option<bool>,
    unique: Option<bool>,
    case_sensitive: Option<bool>,
}

impl<'a> ConfigFileSourceBuilder<'a> {
    /// Read files through a custom registry instead of the built-in one.
    #[must_use]
    pub const fn registry(mut self, registry: &'a ReaderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the file list.
    #[must_use]
    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Override the text encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Override deep merging.
    #[must_use]
    pub const fn merge(mut self, merge: bool) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Override sequence de-duplication.
    #[must_use]
    pub const fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    /// Override case sensitivity.
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    /// Load the files and build the source.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving or reading the files.
    pub fn build(self) -> Result<ConfigFileSource> {
        let config = self.schema.config();
        let files = self.files.unwrap_or_else(|| config.config_file.clone());
        let encoding = self.encoding.or_else(|| config.config_file_encoding.clone());
        let policy = MergePolicy {
            merge: self.merge.unwrap_or(config.config_merge),
            unique: self.unique.unwrap_or(config.config_merge_unique),
        };
        let case_sensitive = self.case_sensitive.unwrap_or(config.case_sensitive);

        let builtin;
        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                builtin = ReaderRegistry::new();
                &builtin
            }
        };
        let values = ConfigLoader::load(registry, &files, encoding.as_deref(), policy)?;
        let values = if case_sensitive {
            values
        } else {
            lowercase_keys(&values)
        };

        Ok(ConfigFileSource {
            values,
            case_sensitive,
        })
    }
}
