use serde::{Deserialize, Serialize};
use std::fs;

use crate::paths;

/// Root configuration structure for guidregen.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuidregenConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via guidregen.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// File-name globs selecting the files to scan, in scan order.
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,

    /// Text that immediately precedes every GUID token.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Extension of sidecar files whose first GUID is the asset's own.
    #[serde(default = "default_metadata_extension")]
    pub metadata_extension: String,

    /// Directory names never descended into.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            file_patterns: default_file_patterns(),
            marker: default_marker(),
            metadata_extension: default_metadata_extension(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_file_patterns() -> Vec<String> {
    ["*.meta", "*.mat", "*.anim", "*.prefab", "*.unity", "*.asset"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_marker() -> String {
    "guid: ".to_string()
}

fn default_metadata_extension() -> String {
    "meta".to_string()
}

fn default_skip_dirs() -> Vec<String> {
    [".git", ".svn", ".hg"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If guidregen.json is missing or invalid, returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full guidregen.json config, falling back to defaults on any error.
pub fn load_config() -> GuidregenConfig {
    match load_config_from_file() {
        Ok(Some(config)) => config,
        Ok(None) => GuidregenConfig::default(),
        Err(err) => {
            crate::log_status!("config", "Ignoring guidregen.json: {}", err);
            GuidregenConfig::default()
        }
    }
}

/// Attempt to load config from guidregen.json. `Ok(None)` when the file is absent.
fn load_config_from_file() -> crate::Result<Option<GuidregenConfig>> {
    let path = paths::guidregen_json()?;

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    let config: GuidregenConfig = serde_json::from_str(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))?;

    Ok(Some(config))
}

/// Save config to guidregen.json (creates if missing).
pub fn save_config(config: &GuidregenConfig) -> crate::Result<()> {
    let path = paths::guidregen_json()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize guidregen.json".to_string()))
    })?;

    crate::io::write_file_atomic(
        &path,
        content.as_bytes(),
        &format!("write {}", path.display()),
    )
}

/// Check if guidregen.json exists
pub fn config_exists() -> bool {
    paths::guidregen_json()
        .map(|p| p.exists())
        .unwrap_or(false)
}

/// Delete guidregen.json (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::guidregen_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Get the path to guidregen.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::guidregen_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}
