//! Error types for the strata library.
//!
//! Every failure during the load phase of a settings source is fatal: the
//! error surfaces synchronously from the constructor and no partially
//! populated settings mapping is ever produced.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for operations that may fail with a strata error.
///
/// # Examples
///
/// ```
/// use strata::{Error, Result};
///
/// fn example_operation() -> Result<bool> {
///     Ok(true)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the strata library.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced config file does not exist.
    #[error("config file not found: {}", path.display())]
    FileNotFound {
        /// The path as it was referenced by the settings config.
        path: PathBuf,
    },

    /// The config file extension is not one of the recognized formats.
    #[error("unsupported config file format '{extension}' for {}", path.display())]
    UnsupportedFormat {
        /// The offending file.
        path: PathBuf,
        /// The extension found on the file (empty if it had none).
        extension: String,
    },

    /// The parser backing a recognized format was not compiled in.
    #[error("the '{dependency}' crate is needed for {format} config files but is not enabled")]
    MissingOptionalDependency {
        /// The affected format.
        format: crate::readers::FileFormat,
        /// The crate that provides the parser.
        dependency: &'static str,
    },

    /// A config file could not be parsed as its declared format.
    #[error("invalid {format} in {}: {message}", path.display())]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The format the file was parsed as.
        format: crate::readers::FileFormat,
        /// Parser diagnostic.
        message: String,
    },

    /// A config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configured text encoding label is not recognized.
    #[error("unknown text encoding '{encoding}'")]
    UnknownEncoding {
        /// The label as configured.
        encoding: String,
    },

    /// File contents are not valid in the configured encoding.
    #[error("{} is not valid {encoding}", path.display())]
    Decode {
        /// The file being decoded.
        path: PathBuf,
        /// The encoding name used for decoding.
        encoding: String,
    },

    /// An invalid filesystem path was provided.
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
        /// The reason the path is invalid.
        reason: String,
    },

    /// Undeclared keys were supplied while the schema forbids extras.
    #[error("extra fields not permitted: {}", keys.join(", "))]
    ExtraForbidden {
        /// The undeclared keys, sorted.
        keys: Vec<String>,
    },

    /// A value could not be accepted for a field.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field (or variable) that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// A JSON (de)serialization error occurred.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if error indicates a config file does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Error;
    /// use std::path::PathBuf;
    ///
    /// let err = Error::FileNotFound { path: PathBuf::from("/nonexistent.toml") };
    /// assert!(err.is_not_found());
    /// ```
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    /// Check if error is caused by a parser backend that was not compiled in.
    #[must_use]
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Self::MissingOptionalDependency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::FileFormat;

    #[test]
    fn test_file_not_found_error() {
        let err = Error::FileNotFound {
            path: PathBuf::from("/etc/app/config.toml"),
        };
        let display = format!("{err}");
        assert!(display.contains("not found"));
        let normalized = display.replace(std::path::MAIN_SEPARATOR, "/");
        assert!(normalized.contains("/etc/app/config.toml"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unsupported_format_error() {
        let err = Error::UnsupportedFormat {
            path: PathBuf::from("settings.xml"),
            extension: "xml".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("unsupported"));
        assert!(display.contains("xml"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_missing_dependency_names_format_and_crate() {
        let err = Error::MissingOptionalDependency {
            format: FileFormat::Yaml,
            dependency: "serde_yaml",
        };
        let display = format!("{err}");
        assert!(display.contains("YAML"));
        assert!(display.contains("'serde_yaml'"));
        assert!(err.is_missing_dependency());
    }

    #[test]
    fn test_parse_error_is_distinct_from_missing_dependency() {
        let err = Error::Parse {
            path: PathBuf::from("bad.json"),
            format: FileFormat::Json,
            message: "expected value at line 1 column 1".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("invalid JSON"));
        assert!(display.contains("bad.json"));
        assert!(!err.is_missing_dependency());
    }

    #[test]
    fn test_extra_forbidden_lists_keys() {
        let err = Error::ExtraForbidden {
            keys: vec!["debug".to_string(), "region".to_string()],
        };
        assert_eq!(format!("{err}"), "extra fields not permitted: debug, region");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::Validation {
            field: "APP_PORT".to_string(),
            message: "not valid JSON".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("validation error"));
        assert!(display.contains("APP_PORT"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(format!("{err}").contains("serialization error"));
    }
}
