use clap::Args;
use serde::Serialize;

use guidregen::regen::{self, FilterScope, RegenSummary, RemapEntry, ScanWarning};

use super::{CmdResult, GlobalArgs, TargetArgs};
use crate::tty::StatusProgress;

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Serialize)]
pub struct ScanOutput {
    command: String,
    root: String,
    scope: FilterScope,
    dry_run: bool,
    summary: RegenSummary,
    changes: Vec<RemapEntry>,
    warnings: Vec<ScanWarning>,
}

/// Preview a regeneration: scan only, nothing is written.
pub fn run(args: ScanArgs, _global: &GlobalArgs) -> CmdResult<ScanOutput> {
    let (target, options) = args.target.resolve()?;

    let result = regen::scan(&target, &options, &mut StatusProgress::default())?;

    Ok((
        ScanOutput {
            command: "scan".to_string(),
            root: target.root.display().to_string(),
            scope: target.scope.clone(),
            dry_run: true,
            summary: result.summary(),
            changes: result.pending_changes().cloned().collect(),
            warnings: result.warnings.clone(),
        },
        0,
    ))
}
