use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use guidregen::defaults::{self, Defaults, GuidregenConfig};

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file)
    Show {
        /// Show only built-in defaults (ignore guidregen.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Set a configuration value at a JSON pointer path
    Set {
        /// JSON pointer path (e.g., /defaults/file_patterns)
        pointer: String,
        /// Value to set (JSON)
        value: String,
    },
    /// Reset configuration to built-in defaults (deletes guidregen.json)
    Reset,
    /// Show the path to guidregen.json
    Path,
}

#[derive(Debug, Serialize, Default)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<GuidregenConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<Defaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Set { pointer, value } => set(&pointer, &value),
        ConfigCommand::Reset => reset(),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let output = if builtin {
        ConfigOutput {
            command: "config.show".to_string(),
            defaults: Some(defaults::builtin_defaults()),
            ..Default::default()
        }
    } else {
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(defaults::load_config()),
            ..Default::default()
        }
    };

    Ok((output, 0))
}

fn set(pointer: &str, value_str: &str) -> CmdResult<ConfigOutput> {
    let value: Value = serde_json::from_str(value_str).map_err(|e| {
        guidregen::Error::validation_invalid_json(
            e,
            Some("parse value".to_string()),
            Some(value_str.chars().take(200).collect::<String>()),
        )
    })?;

    let config = apply_pointer(defaults::load_config(), pointer, value.clone())?;
    defaults::save_config(&config)?;

    Ok((
        ConfigOutput {
            command: "config.set".to_string(),
            config: Some(config),
            pointer: Some(pointer.to_string()),
            value: Some(value),
            ..Default::default()
        },
        0,
    ))
}

/// Replace the value at an existing JSON pointer and re-validate the result.
fn apply_pointer(
    config: GuidregenConfig,
    pointer: &str,
    value: Value,
) -> guidregen::Result<GuidregenConfig> {
    if !pointer.starts_with('/') {
        return Err(guidregen::Error::validation_invalid_argument(
            "pointer",
            "JSON pointer must start with '/'",
            None,
            None,
        ));
    }

    let mut config_json = serde_json::to_value(&config).map_err(|e| {
        guidregen::Error::internal_json(e.to_string(), Some("serialize config".to_string()))
    })?;

    let slot = config_json.pointer_mut(pointer).ok_or_else(|| {
        guidregen::Error::validation_invalid_argument(
            "pointer",
            format!("No configuration key at '{}'", pointer),
            Some(pointer.to_string()),
            None,
        )
    })?;
    *slot = value;

    serde_json::from_value(config_json).map_err(|e| {
        guidregen::Error::config_invalid_value(pointer, None, e.to_string())
    })
}

fn reset() -> CmdResult<ConfigOutput> {
    let deleted = defaults::reset_config()?;

    Ok((
        ConfigOutput {
            command: "config.reset".to_string(),
            defaults: Some(defaults::builtin_defaults()),
            deleted: Some(deleted),
            ..Default::default()
        },
        0,
    ))
}

fn path() -> CmdResult<ConfigOutput> {
    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            path: Some(defaults::config_path()?),
            exists: Some(defaults::config_exists()),
            ..Default::default()
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_pointer_replaces_patterns() {
        let config = apply_pointer(
            GuidregenConfig::default(),
            "/defaults/file_patterns",
            serde_json::json!(["*.prefab"]),
        )
        .unwrap();
        assert_eq!(config.defaults.file_patterns, vec!["*.prefab".to_string()]);
    }

    #[test]
    fn apply_pointer_rejects_unknown_key() {
        let err = apply_pointer(
            GuidregenConfig::default(),
            "/defaults/nope",
            serde_json::json!(1),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn apply_pointer_rejects_wrong_type() {
        let err = apply_pointer(
            GuidregenConfig::default(),
            "/defaults/marker",
            serde_json::json!(42),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn pointer_must_be_absolute() {
        let err = apply_pointer(GuidregenConfig::default(), "defaults", serde_json::json!(1))
            .unwrap_err();
        assert_eq!(err.details["field"], "pointer");
    }
}
