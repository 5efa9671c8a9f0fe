//! Recursive file enumeration filtered by file-name globs.

use crate::error::{Error, Result};
use glob_match::glob_match;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Check the user's file-name patterns before touching the disk.
pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    if patterns.is_empty() {
        return Err(Error::validation_missing_argument(vec!["pattern".to_string()]));
    }

    for pattern in patterns {
        if pattern.trim().is_empty() || pattern.contains('/') || pattern.contains('\\') {
            return Err(Error::validation_invalid_argument(
                "pattern",
                format!(
                    "Invalid file pattern '{}'. Patterns match file names, e.g. '*.prefab'",
                    pattern
                ),
                Some(pattern.clone()),
                Some(patterns.to_vec()),
            ));
        }
    }

    Ok(())
}

/// All files under `root` whose name matches one of `patterns`.
///
/// Files are grouped by the first pattern they match, in pattern order, and
/// sorted by path within a group. Directories named in `skip_dirs` are not
/// descended into. Symlinks are followed; a linked directory already visited
/// through another path is skipped with a status line. A dangling link is
/// kept as a file so that reading it reports the failure. Unreadable
/// directories are errors, not silent gaps.
pub fn collect_files(root: &Path, patterns: &[String], skip_dirs: &[String]) -> Result<Vec<PathBuf>> {
    let mut all = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(canonical(root)?);
    walk_recursive(root, skip_dirs, &mut visited, &mut all)?;
    all.sort();

    let mut seen: HashSet<&Path> = HashSet::new();
    let mut ordered = Vec::new();
    for pattern in patterns {
        for path in &all {
            if seen.contains(path.as_path()) {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };
            if glob_match(pattern, &name) {
                seen.insert(path.as_path());
                ordered.push(path.clone());
            }
        }
    }

    Ok(ordered)
}

fn canonical(dir: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("resolve {}", dir.display())))
    })
}

fn walk_recursive(
    dir: &Path,
    skip_dirs: &[String],
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("list {}", dir.display())))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("list {}", dir.display())))
        })?;
        let path = entry.path();

        // Follows symlinks; a dangling link has no target metadata.
        let Ok(metadata) = std::fs::metadata(&path) else {
            files.push(path);
            continue;
        };

        if metadata.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            if skip_dirs.iter().any(|d| d == &name) {
                continue;
            }
            if !visited.insert(canonical(&path)?) {
                crate::log_status!(
                    "scan",
                    "Skipping {}: directory already scanned through another path",
                    path.display()
                );
                continue;
            }
            walk_recursive(&path, skip_dirs, visited, files)?;
        } else if metadata.is_file() {
            files.push(path);
        } else {
            crate::log_status!("scan", "Skipping {}: not a regular file", path.display());
        }
    }

    Ok(())
}
