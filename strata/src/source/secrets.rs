//! Secrets directory source.
//!
//! Each field is read from a file named after it inside `secrets_dir`, the
//! layout used by Docker and Kubernetes secret mounts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::path::expand_tilde;
use crate::readers::read_text;
use crate::schema::{FieldSpec, SettingsSchema};
use crate::source::{decode_complex, FieldValue, SettingsSource};
use crate::value::normalize_key;

/// Secret values read from one file per field.
#[derive(Debug, Clone, Default)]
pub struct SecretsSource {
    secrets: HashMap<String, String>,
    case_sensitive: bool,
}

impl SecretsSource {
    /// Read every declared field's secret file from the schema's
    /// `secrets_dir`.
    ///
    /// A configured directory that does not exist contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a directory, or a
    /// secret file cannot be read.
    pub fn new(schema: &SettingsSchema) -> Result<Self> {
        let config = schema.config();
        let case_sensitive = config.case_sensitive;
        let Some(configured) = config.secrets_dir.as_deref() else {
            return Ok(Self::default());
        };

        let dir = expand_tilde(configured)?;
        if !dir.exists() {
            log::warn!("secrets directory {} does not exist", configured.display());
            return Ok(Self::default());
        }
        if !dir.is_dir() {
            return Err(Error::Validation {
                field: "secrets_dir".into(),
                message: format!("{} is not a directory", dir.display()),
            });
        }

        let files = Self::list(&dir, case_sensitive)?;
        let mut secrets = HashMap::new();
        for field in schema.fields() {
            let name = normalize_key(field.name(), case_sensitive);
            if let Some(path) = files.get(&name) {
                let contents = read_text(path, None)?;
                secrets.insert(name, contents.trim().to_string());
            }
        }

        log::debug!("read {} secret(s) from {}", secrets.len(), dir.display());
        Ok(Self {
            secrets,
            case_sensitive,
        })
    }

    fn list(dir: &Path, case_sensitive: bool) -> Result<HashMap<String, PathBuf>> {
        let io_error = |source: std::io::Error| Error::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = HashMap::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.insert(normalize_key(name, case_sensitive), path.clone());
            }
        }
        Ok(files)
    }
}

impl SettingsSource for SecretsSource {
    fn name(&self) -> &'static str {
        "secrets"
    }

    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
        let key = normalize_key(field.name(), self.case_sensitive);
        Ok(FieldValue {
            value: self.secrets.get(&key).cloned().map(Value::String),
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
            decode_complex(field.name(), value)
        } else {
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema(dir: &Path) -> SettingsSchema {
        SettingsSchema::builder()
            .field(FieldSpec::new("password"))
            .field(FieldSpec::new("Token"))
            .field(FieldSpec::new("hosts").complex())
            .secrets_dir(dir)
            .build()
            .unwrap()
    }

    #[test]
    fn test_reads_secret_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("password"), "hunter2\n").unwrap();
        fs::write(dir.path().join("token"), "abc").unwrap();
        fs::write(dir.path().join("hosts"), r#"["a", "b"]"#).unwrap();
        fs::write(dir.path().join("unrelated"), "x").unwrap();

        let schema = schema(dir.path());
        let values = SecretsSource::new(&schema).unwrap().resolve_all(&schema).unwrap();
        assert_eq!(values["password"], json!("hunter2"));
        assert_eq!(values["Token"], json!("abc"));
        assert_eq!(values["hosts"], json!(["a", "b"]));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let schema = schema(&dir.path().join("missing"));
        let values = SecretsSource::new(&schema).unwrap().resolve_all(&schema).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_file_instead_of_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("secrets");
        fs::write(&file, "").unwrap();
        let schema = schema(&file);
        assert!(matches!(
            SecretsSource::new(&schema),
            Err(Error::Validation { .. })
        ));
    }
}
