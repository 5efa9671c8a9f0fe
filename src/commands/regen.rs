use clap::Args;
use serde::Serialize;

use guidregen::regen::{
    self, AssumeYes, Confirm, FileChange, FilterScope, RegenStatus, RegenSummary, RemapEntry,
    ScanWarning,
};

use super::{CmdResult, GlobalArgs, TargetArgs};
use crate::tty::{self, StatusProgress, TtyConfirm};

#[derive(Args)]
pub struct RegenArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Skip the confirmation prompt (required when not attached to a terminal)
    #[arg(short, long)]
    yes: bool,
}

#[derive(Serialize)]
pub struct RegenOutput {
    command: String,
    root: String,
    scope: FilterScope,
    status: RegenStatus,
    summary: RegenSummary,
    changes: Vec<RemapEntry>,
    warnings: Vec<ScanWarning>,
    modified_files: Vec<FileChange>,
    modified_count: usize,
    total_replacements: usize,
    started_at: String,
}

pub fn run(args: RegenArgs, _global: &GlobalArgs) -> CmdResult<RegenOutput> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let (target, options) = args.target.resolve()?;

    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else if tty::require_tty_for_interactive() {
        Box::new(TtyConfirm)
    } else {
        return Err(guidregen::Error::validation_invalid_argument(
            "yes",
            "Confirmation requires an interactive terminal",
            None,
            None,
        )
        .with_hint("Pass --yes to regenerate without prompting"));
    };

    let outcome = regen::regenerate(
        &target.root,
        args.target.filter.as_deref(),
        &options,
        &mut StatusProgress::default(),
        confirm.as_mut(),
    )?;

    let report = outcome.report.unwrap_or_default();

    Ok((
        RegenOutput {
            command: "regen".to_string(),
            root: target.root.display().to_string(),
            scope: target.scope,
            status: outcome.status,
            summary: outcome.summary,
            changes: outcome.changes,
            warnings: outcome.warnings,
            modified_count: report.modified_count(),
            total_replacements: report.total_replacements,
            modified_files: report.files,
            started_at,
        },
        0,
    ))
}
