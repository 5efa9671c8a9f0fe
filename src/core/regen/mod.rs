//! GUID regeneration: give assets fresh identifiers and rewrite every
//! reference to them.
//!
//! A run has two strictly ordered phases:
//! 1. [`scan`] reads every matching file, extracts `guid: <token>` references,
//!    records which metadata file declares each GUID and builds the remap table.
//! 2. [`rewrite`] substitutes the new value for every declared GUID whose
//!    mapping changed, persisting only files that were actually modified.
//!
//! [`regenerate`] ties the phases together behind a confirmation gate.

mod guid;
mod rewrite;
mod scan;
mod scope;
mod walk;

pub use guid::{extract_guids, replace_guid, Guid, GUID_LENGTH};
pub use rewrite::{rewrite, FileChange, RewriteReport};
pub use scan::{scan, ScanResult, ScanWarning};
pub use scope::FilterScope;

use crate::defaults::Defaults;
use crate::error::{Error, Result};
use crate::paths;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Types
// ============================================================================

/// Tunables for a run. Usually built from the loaded [`Defaults`].
#[derive(Debug, Clone)]
pub struct RegenOptions {
    pub patterns: Vec<String>,
    pub marker: String,
    pub metadata_extension: String,
    pub skip_dirs: Vec<String>,
}

impl RegenOptions {
    pub fn from_defaults(defaults: &Defaults) -> Self {
        Self {
            patterns: defaults.file_patterns.clone(),
            marker: defaults.marker.clone(),
            metadata_extension: defaults.metadata_extension.clone(),
            skip_dirs: defaults.skip_dirs.clone(),
        }
    }

    /// Replace the configured patterns when the caller supplied any.
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        self
    }

    fn is_metadata(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.metadata_extension.as_str())
            .unwrap_or(false)
    }
}

impl Default for RegenOptions {
    fn default() -> Self {
        Self::from_defaults(&Defaults::default())
    }
}

/// A validated root directory plus the scope inside it.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub root: PathBuf,
    pub scope: FilterScope,
}

impl Target {
    /// Validate `root` and `filter` without reading any file contents.
    pub fn resolve(root: &Path, filter: Option<&str>) -> Result<Self> {
        let root = paths::absolutize(root)?;
        if !root.is_dir() {
            return Err(Error::validation_invalid_argument(
                "root",
                format!("Root directory does not exist: {}", root.display()),
                Some(root.display().to_string()),
                None,
            ));
        }

        let scope = FilterScope::resolve(&root, filter)?;
        Ok(Self { root, scope })
    }
}

/// A scanned file and the distinct GUIDs it mentions, in first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    #[serde(skip)]
    pub path: PathBuf,
    /// Path relative to the root, forward slashes.
    pub file: String,
    pub guids: Vec<Guid>,
    /// When set, `guids[0]` is this file's own GUID.
    pub is_metadata: bool,
}

impl FileRecord {
    /// The GUID this file declares as its own identity, if any.
    pub fn self_guid(&self) -> Option<&Guid> {
        if self.is_metadata {
            self.guids.first()
        } else {
            None
        }
    }
}

/// One old → new mapping and the file that decided its scope.
#[derive(Debug, Clone, Serialize)]
pub struct RemapEntry {
    pub old: Guid,
    pub new: Guid,
    pub home: String,
}

impl RemapEntry {
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Old → new GUID mapping with exactly one entry per GUID seen, in
/// first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    entries: Vec<RemapEntry>,
    index: HashMap<Guid, usize>,
}

impl RemapTable {
    /// Insert a mapping. Returns `false` and leaves the table untouched if
    /// `old` is already present.
    pub fn insert(&mut self, old: Guid, new: Guid, home: impl Into<String>) -> bool {
        if self.index.contains_key(&old) {
            return false;
        }
        self.index.insert(old.clone(), self.entries.len());
        self.entries.push(RemapEntry {
            old,
            new,
            home: home.into(),
        });
        true
    }

    pub fn get(&self, old: &Guid) -> Option<&Guid> {
        self.index.get(old).map(|&i| &self.entries[i].new)
    }

    pub fn entries(&self) -> &[RemapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// GUIDs declared by at least one metadata file. Only these are ever rewritten.
pub type OwnGuids = HashSet<Guid>;

// ============================================================================
// Host seams
// ============================================================================

/// Receives `(label, file, fraction)` updates during both phases.
pub trait Progress {
    fn update(&mut self, label: &str, file: &str, fraction: f32);
}

impl<F> Progress for F
where
    F: FnMut(&str, &str, f32),
{
    fn update(&mut self, label: &str, file: &str, fraction: f32) {
        self(label, file, fraction)
    }
}

/// Discards progress updates.
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _label: &str, _file: &str, _fraction: f32) {}
}

/// What the user is asked to approve before anything is written.
#[derive(Debug, Clone, Serialize)]
pub struct RegenSummary {
    pub files_scanned: usize,
    pub guids_found: usize,
    pub guids_changed: usize,
    pub files_to_rewrite: usize,
}

impl RegenSummary {
    pub fn message(&self) -> String {
        format!(
            "You are going to start the process of GUID regeneration.\n\
             {} asset(s) will have their GUID changed across {} file(s).\n\
             This may have unexpected results.\n\n\
             MAKE A PROJECT BACKUP BEFORE PROCEEDING!",
            self.guids_changed, self.files_to_rewrite
        )
    }
}

/// Gate between scan and rewrite. `Ok(false)` aborts with nothing written.
pub trait Confirm {
    fn confirm(&mut self, summary: &RegenSummary) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&RegenSummary) -> Result<bool>,
{
    fn confirm(&mut self, summary: &RegenSummary) -> Result<bool> {
        self(summary)
    }
}

/// Approves every run without asking.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _summary: &RegenSummary) -> Result<bool> {
        Ok(true)
    }
}

// ============================================================================
// Orchestration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenStatus {
    /// No declared GUID in scope; nothing was asked or written.
    NothingToDo,
    /// The confirmation was declined; nothing was written.
    Declined,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenOutcome {
    pub status: RegenStatus,
    pub summary: RegenSummary,
    pub changes: Vec<RemapEntry>,
    pub warnings: Vec<ScanWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RewriteReport>,
}

/// Validate, scan, confirm, rewrite.
pub fn regenerate(
    root: &Path,
    filter: Option<&str>,
    options: &RegenOptions,
    progress: &mut dyn Progress,
    confirm: &mut dyn Confirm,
) -> Result<RegenOutcome> {
    let target = Target::resolve(root, filter)?;
    walk::validate_patterns(&options.patterns)?;

    let scanned = scan(&target, options, progress)?;
    let summary = scanned.summary();
    let changes: Vec<RemapEntry> = scanned.pending_changes().cloned().collect();
    let warnings = scanned.warnings.clone();

    let status = if changes.is_empty() {
        crate::log_status!("regen", "No GUIDs to regenerate");
        RegenStatus::NothingToDo
    } else if !confirm.confirm(&summary)? {
        crate::log_status!("regen", "Cancelled; no files were modified");
        RegenStatus::Declined
    } else {
        RegenStatus::Completed
    };

    let report = if status == RegenStatus::Completed {
        Some(rewrite(&scanned, options, progress)?)
    } else {
        None
    };

    Ok(RegenOutcome {
        status,
        summary,
        changes,
        warnings,
        report,
    })
}
