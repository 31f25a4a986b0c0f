//! User-home expansion for config file paths.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expand a leading tilde (`~`) to the home directory.
///
/// Handles `~` and `~/path` but not `~user`. Paths without a leading tilde
/// are returned unchanged, relative or not.
///
/// # Errors
///
/// Returns an error if:
/// - The path starts with `~` but contains invalid UTF-8
/// - The home directory cannot be determined
/// - The path uses `~user` syntax
///
/// # Examples
///
/// ```
/// use strata::path::expand_tilde;
/// use std::path::Path;
///
/// let expanded = expand_tilde(Path::new("~/.config/app.toml")).unwrap();
/// assert!(expanded.is_absolute());
/// assert!(expanded.ends_with(".config/app.toml"));
///
/// let unchanged = expand_tilde(Path::new("conf/app.toml")).unwrap();
/// assert_eq!(unchanged, Path::new("conf/app.toml"));
/// ```
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if !path.as_os_str().to_string_lossy().starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let path_str = path.to_str().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
        reason: "Path contains invalid UTF-8".to_string(),
    })?;

    let home = home::home_dir().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
        reason: "Cannot determine home directory".to_string(),
    })?;

    if path_str == "~" {
        Ok(home)
    } else if let Some(rest) = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
    {
        Ok(home.join(rest))
    } else {
        Err(Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "~user syntax is not supported; use ~ or ~/path".to_string(),
        })
    }
}
