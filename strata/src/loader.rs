//! Config file resolution and loading.
//!
//! Files are folded together in list order, so later files take precedence
//! over earlier ones. Every file is resolved and checked (existence, format,
//! parser availability) before the first one is read.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::merge::MergePolicy;
use crate::path::expand_tilde;
use crate::readers::{FileFormat, ReaderRegistry};
use crate::value::Mapping;

/// A config file that has been resolved and is ready to read.
///
/// # Examples
///
/// ```no_run
/// use strata::loader::ConfigFileRef;
/// use strata::readers::FileFormat;
/// use std::path::Path;
///
/// let file = ConfigFileRef::resolve(Path::new("~/.config/app.toml"), None).unwrap();
/// assert_eq!(file.format, FileFormat::Toml);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFileRef {
    /// The resolved path (home directory expanded).
    pub path: PathBuf,
    /// Format inferred from the extension.
    pub format: FileFormat,
    /// Text encoding label, UTF-8 when `None`.
    pub encoding: Option<String>,
}

impl ConfigFileRef {
    /// Resolve a configured path into a file reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] (naming the path as configured) if the
    /// resolved path does not exist, or [`Error::UnsupportedFormat`] if the
    /// extension is not recognized.
    pub fn resolve(path: &Path, encoding: Option<&str>) -> Result<Self> {
        let resolved = expand_tilde(path)?;
        if !resolved.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let format = FileFormat::from_path(&resolved)?;
        Ok(Self {
            path: resolved,
            format,
            encoding: encoding.map(ToString::to_string),
        })
    }
}

/// Loads and folds config files.
///
/// # Examples
///
/// ```no_run
/// use strata::loader::ConfigLoader;
/// use strata::merge::MergePolicy;
/// use strata::readers::ReaderRegistry;
///
/// let registry = ReaderRegistry::new();
/// let values = ConfigLoader::load(
///     &registry,
///     &["base.toml", "local.yaml"],
///     None,
///     MergePolicy::default(),
/// )
/// .unwrap();
/// println!("Loaded {} top-level keys", values.len());
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load every file and fold the results in list order.
    ///
    /// An empty file list yields an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error (missing file, unsupported format,
    /// unavailable parser) before reading anything, otherwise the first read
    /// or parse error.
    pub fn load<P: AsRef<Path>>(
        registry: &ReaderRegistry,
        files: &[P],
        encoding: Option<&str>,
        policy: MergePolicy,
    ) -> Result<Mapping> {
        let resolved = Self::resolve_all(registry, files, encoding)?;

        if !policy.merge && policy.unique {
            log::trace!("config_merge is off; config_merge_unique has no effect");
        }

        let mut config = Mapping::new();
        for file in &resolved {
            let values = Self::load_file(registry, file)?;
            config = policy.apply(&config, &values);
        }

        log::debug!(
            "loaded {} config file(s) into {} top-level key(s)",
            resolved.len(),
            config.len()
        );
        Ok(config)
    }

    /// Resolve every configured path, stopping at the first failure.
    ///
    /// Besides existence and format, this checks that the registry can read
    /// each format, so a build missing a parser fails before any file is
    /// opened.
    ///
    /// # Errors
    ///
    /// Returns an error for the first file that cannot be resolved.
    pub fn resolve_all<P: AsRef<Path>>(
        registry: &ReaderRegistry,
        files: &[P],
        encoding: Option<&str>,
    ) -> Result<Vec<ConfigFileRef>> {
        files
            .iter()
            .map(|file| {
                let file = ConfigFileRef::resolve(file.as_ref(), encoding)?;
                registry.probe(file.format)?;
                log::trace!("resolved config file {}", file.path.display());
                Ok(file)
            })
            .collect()
    }

    /// Read a single resolved file.
    ///
    /// # Errors
    ///
    /// Returns an error if the parser is unavailable or the file cannot be
    /// read or parsed.
    pub fn load_file(registry: &ReaderRegistry, file: &ConfigFileRef) -> Result<Mapping> {
        let reader = registry.probe(file.format)?;
        log::debug!("reading {} config file {}", file.format, file.path.display());
        reader(&file.path, file.encoding.as_deref())
    }
}
