//! Config file readers and the registry that dispatches to them.
//!
//! A reader turns a file path plus an optional text encoding into a raw
//! [`Mapping`]. Readers know nothing about settings schemas, merging or key
//! casing; they only parse.
//!
//! The TOML and YAML readers are compiled in through the `toml` and `yaml`
//! cargo features (both on by default). A registry built without them still
//! recognizes the extensions, so loading such a file reports
//! [`Error::MissingOptionalDependency`] rather than an unknown format.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use ini::{Ini, ParseOption};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::value::Mapping;

/// Name of the INI section whose options apply to every other section.
pub const INI_DEFAULT_SECTION: &str = "DEFAULT";

/// A config file format, identified by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// `.ini`
    Ini,
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ini => write!(f, "INI"),
            Self::Toml => write!(f, "TOML"),
            Self::Yaml => write!(f, "YAML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

impl FileFormat {
    /// Look up a format by extension (without the dot, case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::readers::FileFormat;
    ///
    /// assert_eq!(FileFormat::from_extension("yml"), Some(FileFormat::Yaml));
    /// assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
    /// assert_eq!(FileFormat::from_extension("xml"), None);
    /// ```
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ini" => Some(Self::Ini),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determine the format of a file from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the extension is missing or
    /// not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_extension(&extension).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }

    /// The crate that provides the parser for this format.
    #[must_use]
    pub const fn dependency(self) -> &'static str {
        match self {
            Self::Ini => "rust-ini",
            Self::Toml => "toml",
            Self::Yaml => "serde_yaml",
            Self::Json => "serde_json",
        }
    }
}

/// Signature shared by every format reader.
pub type ReaderFn = fn(&Path, Option<&str>) -> Result<Mapping>;

/// Maps each [`FileFormat`] to the function that reads it.
///
/// Built once and passed by reference to the loader. New formats cannot be
/// added (the set of extensions is fixed), but the reader for any format can
/// be replaced.
///
/// # Examples
///
/// ```
/// use strata::readers::{FileFormat, ReaderRegistry};
///
/// let registry = ReaderRegistry::new();
/// assert!(registry.get(FileFormat::Json).is_some());
///
/// let empty = ReaderRegistry::empty();
/// assert!(empty.probe(FileFormat::Json).unwrap_err().is_missing_dependency());
/// ```
#[derive(Clone)]
pub struct ReaderRegistry {
    readers: HashMap<FileFormat, ReaderFn>,
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.readers.keys().map(ToString::to_string).collect();
        formats.sort();
        f.debug_struct("ReaderRegistry")
            .field("formats", &formats)
            .finish()
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderRegistry {
    /// Create a registry with every reader compiled into this build.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(FileFormat::Ini, read_ini);
        registry.register(FileFormat::Json, read_json);
        #[cfg(feature = "toml")]
        registry.register(FileFormat::Toml, read_toml);
        #[cfg(feature = "yaml")]
        registry.register(FileFormat::Yaml, read_yaml);
        registry
    }

    /// Create a registry with no readers at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }

    /// Register (or replace) the reader for a format.
    ///
    /// Returns the previously registered reader, if any.
    pub fn register(&mut self, format: FileFormat, reader: ReaderFn) -> Option<ReaderFn> {
        self.readers.insert(format, reader)
    }

    /// Get the reader for a format, if one is registered.
    #[must_use]
    pub fn get(&self, format: FileFormat) -> Option<ReaderFn> {
        self.readers.get(&format).copied()
    }

    /// Get the reader for a format, failing if its backend is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOptionalDependency`] if no reader is registered.
    pub fn probe(&self, format: FileFormat) -> Result<ReaderFn> {
        self.get(format).ok_or(Error::MissingOptionalDependency {
            format,
            dependency: format.dependency(),
        })
    }

    /// Read a file, dispatching on its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unsupported or unavailable, or if
    /// the reader fails.
    pub fn read(&self, path: &Path, encoding: Option<&str>) -> Result<Mapping> {
        let format = FileFormat::from_path(path)?;
        let reader = self.probe(format)?;
        log::debug!("reading {format} config file {}", path.display());
        reader(path, encoding)
    }
}

/// Read a file as text in the given encoding (UTF-8 when `None`).
///
/// Encoding labels follow the WHATWG names understood by `encoding_rs`
/// (`utf-8`, `latin1`, `utf-16le`, `shift_jis`, ...). A byte order mark, if
/// present, overrides the label.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the label is unknown, or the
/// bytes are not valid in the encoding.
pub fn read_text(path: &Path, encoding: Option<&str>) -> Result<String> {
    let encoding = match encoding {
        Some(label) => {
            Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| Error::UnknownEncoding {
                encoding: label.to_string(),
            })?
        }
        None => UTF_8,
    };

    let bytes = fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(Error::Decode {
            path: path.to_path_buf(),
            encoding: used.name().to_string(),
        });
    }

    Ok(text.into_owned())
}

/// Read a `.json` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON object.
pub fn read_json(path: &Path, encoding: Option<&str>) -> Result<Mapping> {
    let text = read_text(path, encoding)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| parse_error(path, FileFormat::Json, e.to_string()))?;
    into_mapping(path, FileFormat::Json, value)
}

/// Read an `.ini` file.
///
/// The result has one entry per section plus a [`INI_DEFAULT_SECTION`]
/// entry that is always present. Options in the default section (either an
/// explicit `[DEFAULT]` header or lines before the first header) are
/// inherited by every other section. Option names are lowercased, section
/// names keep their case, and every value is a string.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_ini(path: &Path, encoding: Option<&str>) -> Result<Mapping> {
    let text = read_text(path, encoding)?;
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(&text, options)
        .map_err(|e| parse_error(path, FileFormat::Ini, e.to_string()))?;

    let mut defaults = Mapping::new();
    let mut sections: Vec<(String, Mapping)> = Vec::new();

    for (name, properties) in ini.iter() {
        let entries = properties
            .iter()
            .map(|(key, value)| (key.to_lowercase(), Value::String(value.to_string())));

        match name {
            None | Some(INI_DEFAULT_SECTION) => defaults.extend(entries),
            Some(name) => {
                let existing = sections
                    .iter_mut()
                    .find(|(existing, _)| existing.as_str() == name);
                match existing {
                    Some((_, options)) => options.extend(entries),
                    None => sections.push((name.to_string(), entries.collect())),
                }
            }
        }
    }

    let mut result = Mapping::new();
    for (name, options) in sections {
        let mut section = defaults.clone();
        section.extend(options);
        result.insert(name, Value::Object(section));
    }
    result.insert(INI_DEFAULT_SECTION.to_string(), Value::Object(defaults));

    Ok(result)
}

/// Read a `.toml` file.
///
/// Datetimes become their RFC 3339 string form.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
#[cfg(feature = "toml")]
pub fn read_toml(path: &Path, encoding: Option<&str>) -> Result<Mapping> {
    let text = read_text(path, encoding)?;
    let table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| {
            parse_error(path, FileFormat::Toml, e.message().to_string())
        })?;

    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect())
}

#[cfg(feature = "toml")]
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => float_to_json(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Read a `.yaml` / `.yml` file.
///
/// An empty document is an empty mapping. Non-string keys are converted to
/// their string form and tags are dropped.
///
/// # Errors
///
/// Returns an error if the file cannot be read, cannot be parsed, or its
/// top level is not a mapping.
#[cfg(feature = "yaml")]
pub fn read_yaml(path: &Path, encoding: Option<&str>) -> Result<Mapping> {
    let text = read_text(path, encoding)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text)
        .map_err(|e| parse_error(path, FileFormat::Yaml, e.to_string()))?;
    into_mapping(path, FileFormat::Yaml, yaml_to_json(value))
}

#[cfg(feature = "yaml")]
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                float_to_json(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

#[cfg(feature = "yaml")]
fn yaml_key(key: serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// JSON has no NaN or infinity; keep them readable instead of dropping them.
#[cfg(any(feature = "toml", feature = "yaml"))]
fn float_to_json(f: f64) -> Value {
    serde_json::Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
}

fn into_mapping(path: &Path, format: FileFormat, value: Value) -> Result<Mapping> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(parse_error(
            path,
            format,
            format!("top level must be a mapping, found {}", kind_of(&other)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn parse_error(path: &Path, format: FileFormat, message: String) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        format,
        message,
    }
}
