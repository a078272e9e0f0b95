//! Durable destinations for published artifacts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::RefreshError;

/// Line written after every audit log entry: 80 dashes.
pub const AUDIT_SEPARATOR: &str =
    "--------------------------------------------------------------------------------";

/// Where a [`PublicationLoop`](super::PublicationLoop) puts each artifact.
///
/// The two operations are independent: a failure in one must not affect the
/// other's target.
pub trait ArtifactStore: Send {
    /// Replace the current artifact with `artifact`.
    fn write_current(&mut self, artifact: &str) -> Result<(), RefreshError>;

    /// Append `artifact` as a new audit log entry.
    fn append_audit(&mut self, artifact: &str) -> Result<(), RefreshError>;

    /// Location of the current artifact, for reporting.
    fn current_path(&self) -> &Path;

    /// Location of the audit log, for reporting.
    fn audit_path(&self) -> &Path;
}

/// Filesystem-backed [`ArtifactStore`].
///
/// The current artifact is replaced atomically: the text goes to a hidden
/// temp file in the same directory, which is then renamed over the target.
/// Readers see either the previous artifact or the new one, never a partial
/// file.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    current_path: PathBuf,
    audit_path: PathBuf,
}

impl FsArtifactStore {
    pub fn new(current_path: impl Into<PathBuf>, audit_path: impl Into<PathBuf>) -> Self {
        Self {
            current_path: current_path.into(),
            audit_path: audit_path.into(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .current_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        self.current_path.with_file_name(format!(".{name}.tmp"))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write_current(&mut self, artifact: &str) -> Result<(), RefreshError> {
        let wrap = |source: io::Error| RefreshError::ArtifactWrite {
            path: self.current_path.clone(),
            source,
        };

        ensure_parent(&self.current_path).map_err(wrap)?;
        let tmp_path = self.temp_path();
        fs::write(&tmp_path, artifact).map_err(wrap)?;
        if let Err(e) = fs::rename(&tmp_path, &self.current_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(wrap(e));
        }
        Ok(())
    }

    fn append_audit(&mut self, artifact: &str) -> Result<(), RefreshError> {
        let wrap = |source: io::Error| RefreshError::AuditAppend {
            path: self.audit_path.clone(),
            source,
        };

        ensure_parent(&self.audit_path).map_err(wrap)?;
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)
            .map_err(wrap)?;
        // Single write per entry.
        let entry = format!("{artifact}\n{AUDIT_SEPARATOR}\n");
        log.write_all(entry.as_bytes()).map_err(wrap)?;
        Ok(())
    }

    fn current_path(&self) -> &Path {
        &self.current_path
    }

    fn audit_path(&self) -> &Path {
        &self.audit_path
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_is_eighty_dashes() {
        assert_eq!(AUDIT_SEPARATOR.len(), 80);
        assert!(AUDIT_SEPARATOR.chars().all(|c| c == '-'));
    }

    #[test]
    fn write_current_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("system_prompt.txt");
        let mut store = FsArtifactStore::new(&current, dir.path().join("log.txt"));

        store.write_current("first, and longer").unwrap();
        store.write_current("second").unwrap();

        assert_eq!(fs::read_to_string(&current).unwrap(), "second");
        // No temp file left behind.
        assert!(!dir.path().join(".system_prompt.txt.tmp").exists());
    }

    #[test]
    fn append_audit_accumulates_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("system_prompt_log.txt");
        let mut store = FsArtifactStore::new(dir.path().join("current.txt"), &log);

        store.append_audit("one").unwrap();
        store.append_audit("two\n").unwrap();

        let expected = format!("one\n{AUDIT_SEPARATOR}\ntwo\n\n{AUDIT_SEPARATOR}\n");
        assert_eq!(fs::read_to_string(&log).unwrap(), expected);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("out/nested/current.txt");
        let log = dir.path().join("logs/audit.txt");
        let mut store = FsArtifactStore::new(&current, &log);

        store.write_current("x").unwrap();
        store.append_audit("x").unwrap();

        assert!(current.exists());
        assert!(log.exists());
    }

    #[test]
    fn failure_in_one_target_leaves_the_other_alone() {
        let dir = tempfile::tempdir().unwrap();
        // The audit "file" is a directory, so appends fail.
        let log = dir.path().join("log_is_a_dir");
        fs::create_dir(&log).unwrap();
        let current = dir.path().join("current.txt");
        let mut store = FsArtifactStore::new(&current, &log);

        let err = store.append_audit("x").unwrap_err();
        assert!(matches!(err, RefreshError::AuditAppend { .. }));

        store.write_current("still fine").unwrap();
        assert_eq!(fs::read_to_string(&current).unwrap(), "still fine");
    }

    #[test]
    fn write_error_names_the_target() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let current = dir.path().join("current_is_a_dir");
        fs::create_dir(&current).unwrap();
        fs::write(current.join("occupant"), "x").unwrap();
        let mut store = FsArtifactStore::new(&current, dir.path().join("log.txt"));

        let err = store.write_current("x").unwrap_err();
        assert!(err.to_string().contains("current_is_a_dir"));
        assert!(!dir.path().join(".current_is_a_dir.tmp").exists());
    }
}
