use crate::error::{Error, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

/// Base guidregen config directory (~/.config/guidregen/, %APPDATA%\guidregen on Windows)
pub fn guidregen() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("guidregen"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("guidregen"))
    }
}

/// Global guidregen.json config file path
pub fn guidregen_json() -> Result<PathBuf> {
    Ok(guidregen()?.join("guidregen.json"))
}

/// Make `path` absolute against the current directory and fold `.`/`..`
/// lexically. The path does not need to exist.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("resolve current directory".to_string()))
        })?;
        cwd.join(path)
    };

    Ok(normalize(&joined))
}

/// Lexical normalization: drops `.` segments and resolves `..` against the
/// preceding segment.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Display path of `path` relative to `root`, with forward slashes.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
