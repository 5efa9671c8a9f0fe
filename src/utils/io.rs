//! File I/O primitives with consistent error handling.
//!
//! Asset files are handled as raw bytes: GUID tokens are ASCII, and binary or
//! non-UTF-8 payloads must round-trip untouched.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents with standardized error handling.
pub fn read_file(path: &Path, operation: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write content to file with standardized error handling.
pub fn write_file(path: &Path, content: &[u8], operation: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write content to file atomically (write to .tmp, then rename).
pub fn write_file_atomic(path: &Path, content: &[u8], operation: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    })?;

    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    })?;

    let tmp_path = parent.join(format!("{}.tmp", filename.to_string_lossy()));

    fs::write(&tmp_path, content).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation)))
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} (rename)", operation)))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn read_file_keeps_non_utf8_bytes() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0xff, 0x00, b'g']).unwrap();

        let content = read_file(temp.path(), "test read").unwrap();
        assert_eq!(content, vec![0xff, 0x00, b'g']);
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let result = read_file(Path::new("/nonexistent/path.meta"), "test read");
        let err = result.unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
        assert_eq!(err.details["context"], "test read");
    }

    #[test]
    fn write_file_atomic_replaces_content_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guidregen.json");
        write_file(&path, b"old", "seed").unwrap();

        write_file_atomic(&path, b"new", "test write").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join("guidregen.json.tmp").exists());
    }
}
