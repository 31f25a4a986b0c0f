//! Dotenv file source.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::path::expand_tilde;
use crate::readers::read_text;
use crate::schema::{FieldSpec, SettingsSchema};
use crate::source::{EnvSource, FieldValue, SettingsSource};

/// Variables read from the schema's `env_file`.
///
/// Lookups follow the same rules as [`EnvSource`]. A configured file that
/// does not exist contributes nothing.
#[derive(Debug, Clone)]
pub struct DotEnvSource {
    path: Option<PathBuf>,
    vars: EnvSource,
}

impl DotEnvSource {
    /// Read the schema's `env_file`, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, decoded or
    /// parsed.
    pub fn new(schema: &SettingsSchema) -> Result<Self> {
        let config = schema.config();
        let Some(configured) = config.env_file.as_deref() else {
            return Ok(Self::empty(schema));
        };

        let path = expand_tilde(configured)?;
        if !path.is_file() {
            log::debug!("env file {} not found, skipping", configured.display());
            return Ok(Self::empty(schema));
        }

        let pairs = Self::parse(&path, config.env_file_encoding.as_deref())?;
        log::debug!("read {} variable(s) from {}", pairs.len(), path.display());
        Ok(Self {
            path: Some(path),
            vars: EnvSource::from_vars(schema, pairs),
        })
    }

    /// Returns the file that was read, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn empty(schema: &SettingsSchema) -> Self {
        Self {
            path: None,
            vars: EnvSource::from_vars(schema, std::iter::empty::<(String, String)>()),
        }
    }

    fn parse(path: &Path, encoding: Option<&str>) -> Result<Vec<(String, String)>> {
        let text = read_text(path, encoding)?;
        dotenvy::from_read_iter(text.as_bytes())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Validation {
                field: path.display().to_string(),
                message: format!("invalid env file: {e}"),
            })
    }
}

impl SettingsSource for DotEnvSource {
    fn name(&self) -> &'static str {
        "dotenv"
    }

    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
        self.vars.field_value(field)
    }

    fn prepare_field_value(
        &self,
        field: &FieldSpec,
        value: Option<Value>,
        is_complex: bool,
    ) -> Result<Option<Value>> {
        self.vars.prepare_field_value(field, value, is_complex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reads_env_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# comment\nAPP_LEVEL=debug\nAPP_TAGS='[\"a\", \"b\"]'\nUNRELATED=1\n",
        )
        .unwrap();

        let schema = SettingsSchema::builder()
            .field(FieldSpec::new("level"))
            .field(FieldSpec::new("tags").complex())
            .env_prefix("APP_")
            .env_file(&path)
            .build()
            .unwrap();

        let source = DotEnvSource::new(&schema).unwrap();
        assert_eq!(source.path(), Some(path.as_path()));

        let values = source.resolve_all(&schema).unwrap();
        assert_eq!(values["level"], json!("debug"));
        assert_eq!(values["tags"], json!(["a", "b"]));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_missing_env_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let schema = SettingsSchema::builder()
            .field(FieldSpec::new("level"))
            .env_file(dir.path().join("missing.env"))
            .build()
            .unwrap();

        let source = DotEnvSource::new(&schema).unwrap();
        assert!(source.path().is_none());
        assert!(source.resolve_all(&schema).unwrap().is_empty());
    }

    #[test]
    fn test_no_env_file_configured() {
        let schema = SettingsSchema::builder()
            .field(FieldSpec::new("level"))
            .build()
            .unwrap();
        let source = DotEnvSource::new(&schema).unwrap();
        assert!(source.resolve_all(&schema).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_env_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "APP_LEVEL='unterminated\n").unwrap();

        let schema = SettingsSchema::builder()
            .field(FieldSpec::new("level"))
            .env_file(&path)
            .build()
            .unwrap();
        assert!(matches!(
            DotEnvSource::new(&schema),
            Err(Error::Validation { .. })
        ));
    }
}
