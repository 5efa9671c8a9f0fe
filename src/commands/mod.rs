use clap::Args;
use std::path::PathBuf;

use guidregen::defaults;
use guidregen::regen::{RegenOptions, Target};

pub type CmdResult<T> = guidregen::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Root, scope and file selection shared by `scan` and `regen`.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Project directory to search (usually the Assets folder)
    pub root: PathBuf,

    /// Only regenerate GUIDs of assets under this directory, or of this single asset.
    /// Relative paths are taken from ROOT.
    #[arg(long, value_name = "PATH")]
    pub filter: Option<String>,

    /// File-name glob to scan (repeatable; overrides configured patterns)
    #[arg(long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,
}

impl TargetArgs {
    /// Validate paths and merge CLI patterns over the configured defaults.
    pub fn resolve(&self) -> guidregen::Result<(Target, RegenOptions)> {
        let target = Target::resolve(&self.root, self.filter.as_deref())?;
        let options = RegenOptions::from_defaults(&defaults::load_defaults())
            .with_patterns(self.patterns.clone());
        Ok((target, options))
    }
}

pub mod config;
pub mod regen;
pub mod scan;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (guidregen::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Scan(args) => dispatch!(args, global, scan),
        crate::Commands::Regen(args) => dispatch!(args, global, regen),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
