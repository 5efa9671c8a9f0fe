use super::guid::{extract_guids, Guid};
use super::walk;
use super::{FileRecord, OwnGuids, Progress, RegenOptions, RegenSummary, RemapEntry, RemapTable, Target};
use crate::error::Result;
use crate::io::read_file;
use crate::paths;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Everything the rewrite phase needs. Built fresh per run.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub root: PathBuf,
    pub remap: RemapTable,
    /// Files containing at least one GUID, in scan order.
    pub records: Vec<FileRecord>,
    pub own: OwnGuids,
    pub files_scanned: usize,
    pub warnings: Vec<ScanWarning>,
}

/// Something suspicious found while scanning. Never fatal.
#[derive(Debug, Clone, Serialize)]
pub struct ScanWarning {
    pub kind: String,
    pub guid: Guid,
    pub files: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ScanResult {
    /// Mappings that the rewrite phase will apply: declared GUIDs whose value changed.
    pub fn pending_changes(&self) -> impl Iterator<Item = &RemapEntry> {
        self.remap
            .entries()
            .iter()
            .filter(|entry| entry.is_change() && self.own.contains(&entry.old))
    }

    /// Files that mention at least one pending change.
    pub fn files_to_rewrite(&self) -> usize {
        self.records
            .iter()
            .filter(|record| {
                record.guids.iter().any(|guid| {
                    self.own.contains(guid)
                        && self.remap.get(guid).is_some_and(|new| new != guid)
                })
            })
            .count()
    }

    pub fn summary(&self) -> RegenSummary {
        RegenSummary {
            files_scanned: self.files_scanned,
            guids_found: self.remap.len(),
            guids_changed: self.pending_changes().count(),
            files_to_rewrite: self.files_to_rewrite(),
        }
    }
}

/// Read every matching file under the target and build the remap table.
///
/// A GUID gets a fresh value when any metadata file declaring it is in scope,
/// or, for GUIDs nobody declares, when the first file mentioning it is in
/// scope. Everything else maps to itself. No file is modified.
pub fn scan(target: &Target, options: &RegenOptions, progress: &mut dyn Progress) -> Result<ScanResult> {
    walk::validate_patterns(&options.patterns)?;
    let files = walk::collect_files(&target.root, &options.patterns, &options.skip_dirs)?;
    let marker = options.marker.as_bytes();
    let total = files.len();

    let mut records: Vec<FileRecord> = Vec::new();
    let mut own = OwnGuids::new();
    // GUID -> indices of records declaring it
    let mut owners: HashMap<Guid, Vec<usize>> = HashMap::new();
    // GUID -> index of first record mentioning it
    let mut first_seen: HashMap<Guid, usize> = HashMap::new();
    let mut order: Vec<Guid> = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let file = paths::relative_display(&target.root, path);
        progress.update("Scanning", &file, i as f32 / total as f32);

        let content = read_file(path, &format!("read {}", path.display()))?;

        let mut guids: Vec<Guid> = Vec::new();
        let mut seen: HashSet<Guid> = HashSet::new();
        for guid in extract_guids(&content, marker) {
            if seen.insert(guid.clone()) {
                guids.push(guid);
            }
        }
        if guids.is_empty() {
            continue;
        }

        let index = records.len();
        let record = FileRecord {
            path: path.clone(),
            file,
            guids,
            is_metadata: options.is_metadata(path),
        };

        if let Some(self_guid) = record.self_guid() {
            own.insert(self_guid.clone());
            owners.entry(self_guid.clone()).or_default().push(index);
        }
        for guid in &record.guids {
            if !first_seen.contains_key(guid) {
                first_seen.insert(guid.clone(), index);
                order.push(guid.clone());
            }
        }

        records.push(record);
    }
    progress.update("Scanning", "", 1.0);

    let mut taken: HashSet<Guid> = order.iter().cloned().collect();
    let mut remap = RemapTable::default();
    let mut warnings = Vec::new();

    for old in order {
        let declared_by = owners.get(&old).map(Vec::as_slice).unwrap_or(&[]);
        let home_candidates: Vec<usize> = if declared_by.is_empty() {
            vec![first_seen[&old]]
        } else {
            declared_by.to_vec()
        };

        let in_scope = |i: &usize| {
            target
                .scope
                .contains(&records[*i].path, &options.metadata_extension)
        };

        if declared_by.len() > 1 {
            let files: Vec<String> = declared_by.iter().map(|&i| records[i].file.clone()).collect();
            // Substitution is per GUID, not per file, so every copy gets the same new value.
            let hint = declared_by.iter().any(in_scope).then(|| {
                "Every declaring copy receives the same new GUID, so the copies keep colliding. \
                 Regenerate with a root that contains only one copy, then move it back."
                    .to_string()
            });
            crate::log_status!(
                "scan",
                "GUID {} is declared by {} metadata files",
                old,
                files.len()
            );
            warnings.push(ScanWarning {
                kind: "duplicate_guid".to_string(),
                guid: old.clone(),
                message: format!(
                    "GUID {} is declared by {} metadata files: {}",
                    old,
                    files.len(),
                    files.join(", ")
                ),
                files,
                hint,
            });
        }

        let in_scope_home = home_candidates.iter().find(|i| in_scope(i));

        match in_scope_home {
            Some(&home) => {
                let new = fresh_guid(&mut taken);
                remap.insert(old, new, records[home].file.clone());
            }
            None => {
                let home = records[home_candidates[0]].file.clone();
                remap.insert(old.clone(), old, home);
            }
        }
    }

    let result = ScanResult {
        root: target.root.clone(),
        remap,
        records,
        own,
        files_scanned: total,
        warnings,
    };
    for entry in result.pending_changes() {
        crate::log_status!("scan", "{}: {} -> {}", entry.home, entry.old, entry.new);
    }

    Ok(result)
}

/// A random GUID not yet used anywhere in this run.
fn fresh_guid(taken: &mut HashSet<Guid>) -> Guid {
    loop {
        let candidate = Guid::generate();
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        crate::log_status!("scan", "Generated GUID {} collides; drawing another", candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{FilterScope, NoProgress};
    use super::*;
    use tempfile::TempDir;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccc";

    fn g(s: &str) -> Guid {
        Guid::parse(s).unwrap()
    }

    fn target(dir: &TempDir, scope: FilterScope) -> Target {
        Target {
            root: paths::normalize(dir.path()),
            scope,
        }
    }

    fn meta(guid: &str) -> String {
        format!("fileFormatVersion: 2\nguid: {}\n", guid)
    }

    #[test]
    fn metadata_first_guid_is_own() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.mat.meta"),
            format!("{}ref: {{guid: {}}}\n", meta(A), B),
        )
        .unwrap();
        std::fs::write(dir.path().join("a.mat"), format!("tex: {{guid: {}}}\n", C)).unwrap();

        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress)
            .unwrap();

        assert_eq!(result.own.len(), 1);
        assert!(result.own.contains(&g(A)));
        assert_eq!(result.remap.len(), 3);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].file, "a.mat.meta");
        assert_eq!(result.records[0].guids, vec![g(A), g(B)]);
    }

    #[test]
    fn records_are_deduplicated_in_first_seen_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("s.unity"),
            format!("guid: {}\nguid: {}\nguid: {}\nguid: {}\n", B, A, B, A),
        )
        .unwrap();

        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress)
            .unwrap();

        assert_eq!(result.records[0].guids, vec![g(B), g(A)]);
        assert!(result.own.is_empty());
    }

    #[test]
    fn out_of_scope_guids_map_to_themselves() {
        let dir = TempDir::new().unwrap();
        let root = paths::normalize(dir.path());
        std::fs::create_dir_all(root.join("In")).unwrap();
        std::fs::create_dir_all(root.join("Out")).unwrap();
        std::fs::write(root.join("In").join("x.prefab.meta"), meta(A)).unwrap();
        std::fs::write(root.join("Out").join("y.prefab.meta"), meta(B)).unwrap();

        let scope = FilterScope::Directory(root.join("In"));
        let result = scan(&target(&dir, scope), &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_ne!(result.remap.get(&g(A)), Some(&g(A)));
        assert_eq!(result.remap.get(&g(B)), Some(&g(B)));
        assert_eq!(result.pending_changes().count(), 1);
    }

    #[test]
    fn owner_in_scope_wins_over_earlier_outside_reference() {
        // The scene is scanned first, so the GUID is first seen outside the
        // scope. Its declaring metadata file decides.
        let dir = TempDir::new().unwrap();
        let root = paths::normalize(dir.path());
        std::fs::create_dir_all(root.join("Out")).unwrap();
        std::fs::create_dir_all(root.join("Props")).unwrap();
        std::fs::write(root.join("Out").join("scene.unity"), format!("guid: {}\n", A)).unwrap();
        std::fs::write(root.join("Props").join("crate.prefab.meta"), meta(A)).unwrap();

        let mut options = RegenOptions::default();
        options.patterns = vec!["*.unity".to_string(), "*.meta".to_string()];
        let scope = FilterScope::Directory(root.join("Props"));
        let result = scan(&target(&dir, scope), &options, &mut NoProgress).unwrap();

        let entry = &result.remap.entries()[0];
        assert!(entry.is_change());
        assert_eq!(entry.home, "Props/crate.prefab.meta");
    }

    #[test]
    fn new_guids_are_unique_and_valid() {
        let dir = TempDir::new().unwrap();
        for (i, guid) in [A, B, C].iter().enumerate() {
            std::fs::write(dir.path().join(format!("{}.meta", i)), meta(guid)).unwrap();
        }

        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress)
            .unwrap();

        let news: HashSet<&Guid> = result.remap.entries().iter().map(|e| &e.new).collect();
        assert_eq!(news.len(), 3);
        for entry in result.remap.entries() {
            assert!(entry.is_change());
            assert!(Guid::parse(entry.new.as_str()).is_some());
        }
    }

    #[test]
    fn duplicate_declarations_produce_warning() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.meta"), meta(A)).unwrap();
        std::fs::write(dir.path().join("two.meta"), meta(A)).unwrap();

        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress)
            .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, "duplicate_guid");
        assert_eq!(result.warnings[0].files, vec!["one.meta", "two.meta"]);
        assert_eq!(result.remap.len(), 1);
    }

    #[test]
    fn duplicate_spanning_the_filter_warns_that_copies_keep_colliding() {
        let dir = TempDir::new().unwrap();
        let root = paths::normalize(dir.path());
        std::fs::create_dir_all(root.join("A")).unwrap();
        std::fs::create_dir_all(root.join("B")).unwrap();
        std::fs::write(root.join("A").join("x.mat.meta"), meta(A)).unwrap();
        std::fs::write(root.join("B").join("x.mat.meta"), meta(A)).unwrap();

        let scope = FilterScope::Directory(root.join("B"));
        let result = scan(&target(&dir, scope), &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(result.warnings.len(), 1);
        let hint = result.warnings[0].hint.as_deref().unwrap();
        assert!(hint.contains("keep colliding"));
        assert_eq!(result.pending_changes().count(), 1);
    }

    #[test]
    fn duplicate_outside_the_filter_has_no_hint() {
        let dir = TempDir::new().unwrap();
        let root = paths::normalize(dir.path());
        std::fs::create_dir_all(root.join("A")).unwrap();
        std::fs::create_dir_all(root.join("B")).unwrap();
        std::fs::write(root.join("A").join("one.meta"), meta(A)).unwrap();
        std::fs::write(root.join("A").join("two.meta"), meta(A)).unwrap();

        let scope = FilterScope::Directory(root.join("B"));
        let result = scan(&target(&dir, scope), &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].hint.is_none());
        assert_eq!(result.pending_changes().count(), 0);
    }

    #[test]
    fn undeclared_guids_in_scope_are_not_pending() {
        // A built-in shader reference: remapped, but never rewritten or logged.
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.meta"), meta(A)).unwrap();
        std::fs::write(dir.path().join("m.mat"), format!("shader: {{guid: {}}}\n", B)).unwrap();

        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress)
            .unwrap();

        assert!(result.remap.get(&g(B)).is_some_and(|new| new != &g(B)));
        let pending: Vec<&Guid> = result.pending_changes().map(|e| &e.old).collect();
        assert_eq!(pending, vec![&g(A)]);
        assert_eq!(result.summary().guids_changed, 1);
    }

    #[test]
    fn progress_reports_each_file_and_completion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.meta"), meta(A)).unwrap();
        std::fs::write(dir.path().join("b.mat"), "no guids here").unwrap();

        let mut updates: Vec<(String, String, f32)> = Vec::new();
        let mut record = |label: &str, file: &str, fraction: f32| {
            updates.push((label.to_string(), file.to_string(), fraction));
        };
        let result = scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut record)
            .unwrap();

        assert_eq!(result.files_scanned, 2);
        assert_eq!(result.records.len(), 1);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0], ("Scanning".to_string(), "a.meta".to_string(), 0.0));
        assert_eq!(updates[2].2, 1.0);
    }

    #[test]
    fn scan_does_not_modify_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.meta");
        std::fs::write(&path, meta(A)).unwrap();

        scan(&target(&dir, FilterScope::All), &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), meta(A));
    }
}
