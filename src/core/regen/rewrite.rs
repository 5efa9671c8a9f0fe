use super::guid::{replace_guid, Guid};
use super::{Progress, RegenOptions, ScanResult};
use crate::error::{Error, Result, RewriteProgressDetails};
use crate::io::{read_file, write_file};
use serde::Serialize;

/// A file persisted by the rewrite phase.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    pub file: String,
    pub replacements: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    pub files: Vec<FileChange>,
    pub total_replacements: usize,
}

impl RewriteReport {
    pub fn modified_count(&self) -> usize {
        self.files.len()
    }
}

/// Apply the scan's remap table to every file that references a declared GUID.
///
/// Files are overwritten in place and only when at least one substitution
/// happened. There is no rollback: if a file fails, files already written stay
/// written and the error lists them.
pub fn rewrite(
    scan: &ScanResult,
    options: &RegenOptions,
    progress: &mut dyn Progress,
) -> Result<RewriteReport> {
    let marker = options.marker.as_bytes();
    let total = scan.records.len();
    let mut report = RewriteReport::default();

    for (i, record) in scan.records.iter().enumerate() {
        progress.update("Regenerating GUIDs", &record.file, i as f32 / total as f32);

        let stopped_here = |report: &RewriteReport| RewriteProgressDetails {
            file: record.file.clone(),
            rewritten_files: report.files.iter().map(|f| f.file.clone()).collect(),
            remaining_files: total - i - 1,
        };

        let mut substitutions: Vec<(&Guid, &Guid)> = Vec::new();
        for old in &record.guids {
            if !scan.own.contains(old) {
                continue;
            }
            let Some(new) = scan.remap.get(old) else {
                let err = Error::regen_integrity(old.as_str(), stopped_here(&report));
                crate::log_status!("regen", "{}", err.message);
                return Err(err);
            };
            if new == old {
                continue;
            }
            substitutions.push((old, new));
        }

        if substitutions.is_empty() {
            continue;
        }

        let mut content = read_file(&record.path, &format!("read {}", record.path.display()))
            .map_err(|e| abort(e, stopped_here(&report)))?;

        let mut replacements = 0;
        for (old, new) in substitutions {
            let (updated, count) = replace_guid(&content, marker, old, new);
            content = updated;
            replacements += count;
        }

        if replacements == 0 {
            continue;
        }

        write_file(
            &record.path,
            &content,
            &format!("write {}", record.path.display()),
        )
        .map_err(|e| abort(e, stopped_here(&report)))?;

        report.total_replacements += replacements;
        report.files.push(FileChange {
            file: record.file.clone(),
            replacements,
        });
    }
    progress.update("Regenerating GUIDs", "", 1.0);

    crate::log_status!("regen", "Modified {} file(s)", report.modified_count());
    Ok(report)
}

fn abort(cause: Error, progress: RewriteProgressDetails) -> Error {
    let error = match cause.details.get("error").and_then(|v| v.as_str()) {
        Some(detail) => format!("{}: {}", cause.message, detail),
        None => cause.message.clone(),
    };
    let err = Error::regen_rewrite_aborted(error, progress);
    crate::log_status!(
        "regen",
        "{} ({} file(s) already rewritten)",
        err.message,
        err.details["rewrittenFiles"].as_array().map_or(0, Vec::len)
    );
    err
}

#[cfg(test)]
mod tests {
    use super::super::{scan, FileRecord, FilterScope, NoProgress, RemapTable, Target};
    use super::*;
    use crate::paths;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn g(s: &str) -> Guid {
        Guid::parse(s).unwrap()
    }

    fn scan_all(dir: &TempDir) -> ScanResult {
        let target = Target {
            root: paths::normalize(dir.path()),
            scope: FilterScope::All,
        };
        scan(&target, &RegenOptions::default(), &mut NoProgress).unwrap()
    }

    #[test]
    fn rewrites_own_guid_everywhere_it_is_referenced() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("crate.prefab.meta"), format!("guid: {}\n", A)).unwrap();
        std::fs::write(
            dir.path().join("level.unity"),
            format!("prefab: {{guid: {}}}\nshader: {{guid: {}}}\n", A, B),
        )
        .unwrap();

        let result = scan_all(&dir);
        let new = result.remap.get(&g(A)).unwrap().clone();
        let report = rewrite(&result, &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(report.modified_count(), 2);
        assert_eq!(report.total_replacements, 2);
        let level = std::fs::read_to_string(dir.path().join("level.unity")).unwrap();
        assert_eq!(level, format!("prefab: {{guid: {}}}\nshader: {{guid: {}}}\n", new, B));
    }

    #[test]
    fn files_without_own_guids_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let scene = dir.path().join("level.unity");
        std::fs::write(&scene, format!("shader: {{guid: {}}}\n", B)).unwrap();
        let before = std::fs::metadata(&scene).unwrap().modified().unwrap();

        let result = scan_all(&dir);
        let report = rewrite(&result, &RegenOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(report.modified_count(), 0);
        assert_eq!(std::fs::metadata(&scene).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn missing_remap_entry_is_integrity_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.meta");
        std::fs::write(&path, format!("guid: {}\n", A)).unwrap();

        let scan = ScanResult {
            root: dir.path().to_path_buf(),
            remap: RemapTable::default(),
            records: vec![FileRecord {
                path: path.clone(),
                file: "a.meta".to_string(),
                guids: vec![g(A)],
                is_metadata: true,
            }],
            own: HashSet::from([g(A)]),
            files_scanned: 1,
            warnings: Vec::new(),
        };

        let err = rewrite(&scan, &RegenOptions::default(), &mut NoProgress).unwrap_err();

        assert_eq!(err.code.as_str(), "regen.integrity");
        assert_eq!(err.details["file"], "a.meta");
        assert_eq!(err.details["rewrittenFiles"].as_array().unwrap().len(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("guid: {}\n", A));
    }

    #[test]
    fn vanished_file_aborts_with_progress_details() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.meta"), format!("guid: {}\n", A)).unwrap();
        std::fs::write(dir.path().join("b.prefab"), format!("ref: {{guid: {}}}\n", A)).unwrap();

        let result = scan_all(&dir);
        std::fs::remove_file(dir.path().join("b.prefab")).unwrap();

        let err = rewrite(&result, &RegenOptions::default(), &mut NoProgress).unwrap_err();

        assert_eq!(err.code.as_str(), "regen.rewrite_aborted");
        assert_eq!(err.details["file"], "b.prefab");
        assert_eq!(err.details["rewrittenFiles"][0], "a.meta");
        assert_eq!(err.details["remainingFiles"], 0);
    }

    #[test]
    fn write_failure_aborts_with_progress_details() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.meta"), format!("guid: {}\n", A)).unwrap();
        let locked = dir.path().join("b.prefab");
        std::fs::write(&locked, format!("ref: {{guid: {}}}\n", A)).unwrap();
        std::fs::write(dir.path().join("c.prefab"), format!("ref: {{guid: {}}}\n", A)).unwrap();

        let result = scan_all(&dir);
        let mut permissions = std::fs::metadata(&locked).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&locked, permissions).unwrap();
        if std::fs::OpenOptions::new().write(true).open(&locked).is_ok() {
            // Running with privileges that ignore file modes.
            return;
        }

        let err = rewrite(&result, &RegenOptions::default(), &mut NoProgress).unwrap_err();

        assert_eq!(err.code.as_str(), "regen.rewrite_aborted");
        assert_eq!(err.details["file"], "b.prefab");
        assert_eq!(err.details["rewrittenFiles"][0], "a.meta");
        assert_eq!(err.details["remainingFiles"], 1);
        assert!(err.details["error"].as_str().unwrap().contains("IO error"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("c.prefab")).unwrap(),
            format!("ref: {{guid: {}}}\n", A)
        );
    }

    #[test]
    fn rescanning_rewritten_file_finds_only_new_guid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.meta"), format!("guid: {}", A)).unwrap();

        let first = scan_all(&dir);
        let new = first.remap.get(&g(A)).unwrap().clone();
        rewrite(&first, &RegenOptions::default(), &mut NoProgress).unwrap();

        let second = scan_all(&dir);
        assert_eq!(second.records[0].guids, vec![new]);
        assert!(second.remap.get(&g(A)).is_none());
    }

    #[test]
    fn binary_bytes_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.asset");
        std::fs::write(dir.path().join("a.meta"), format!("guid: {}\n", A)).unwrap();
        let mut bytes = vec![0x00, 0xff, 0xfe];
        bytes.extend_from_slice(format!("guid: {}", A).as_bytes());
        bytes.push(0x80);
        std::fs::write(&path, &bytes).unwrap();

        let result = scan_all(&dir);
        let new = result.remap.get(&g(A)).unwrap().clone();
        rewrite(&result, &RegenOptions::default(), &mut NoProgress).unwrap();

        let mut expected = vec![0x00, 0xff, 0xfe];
        expected.extend_from_slice(format!("guid: {}", new).as_bytes());
        expected.push(0x80);
        assert_eq!(std::fs::read(&path).unwrap(), expected);
    }
}
