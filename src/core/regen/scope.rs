//! Filter scope: which files get fresh GUIDs.

use crate::error::{Error, Result};
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Restricts which files' GUIDs are regenerated. Files outside the scope are
/// still scanned, but their GUIDs map to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum FilterScope {
    /// Every scanned file is in scope.
    All,
    /// Files at or below this directory.
    Directory(PathBuf),
    /// This file and its metadata sidecar (`<file>.<metadata_extension>`).
    File(PathBuf),
}

impl FilterScope {
    /// Resolve a user-supplied filter against the (absolute, normalized) root.
    ///
    /// `None` or an empty string selects the whole tree. Relative filters are
    /// resolved against `root`. A filter that does not lie under `root` is a
    /// validation error; no I/O beyond `stat` happens here.
    pub fn resolve(root: &Path, filter: Option<&str>) -> Result<Self> {
        let raw = match filter.map(str::trim) {
            None | Some("") => return Ok(FilterScope::All),
            Some(raw) => raw,
        };

        let path = paths::normalize(&root.join(raw));
        if !path.starts_with(root) {
            return Err(Error::validation_invalid_argument(
                "filter",
                format!(
                    "Filter path must be inside the root directory (filter: {}, root: {})",
                    path.display(),
                    root.display()
                ),
                Some(raw.to_string()),
                None,
            ));
        }

        if path == root {
            Ok(FilterScope::All)
        } else if path.is_file() {
            Ok(FilterScope::File(path))
        } else {
            Ok(FilterScope::Directory(path))
        }
    }

    /// Whether `path` (absolute) is in scope.
    pub fn contains(&self, path: &Path, metadata_extension: &str) -> bool {
        match self {
            FilterScope::All => true,
            FilterScope::Directory(dir) => path.starts_with(dir),
            FilterScope::File(file) => {
                path == file.as_path() || path == sidecar_of(file, metadata_extension)
            }
        }
    }
}

fn sidecar_of(file: &Path, metadata_extension: &str) -> PathBuf {
    let mut os = file.as_os_str().to_os_string();
    os.push(".");
    os.push(metadata_extension);
    PathBuf::from(os)
}
