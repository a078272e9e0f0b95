//! Modification-time cache for the static base document.
//!
//! The base document changes rarely but is needed on every publication tick.
//! [`StaticDocumentCache`] stats the file each time and only re-reads it when
//! the modification time differs from the one recorded at the last read.
//! The comparison is exact: a file rewritten with identical bytes but a new
//! mtime is read again.
//!
//! A missing file is not an error. The cache reports
//! [`DocumentStatus::Missing`], forgets whatever it held and serves empty
//! text until the file reappears.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::RefreshError;

/// What a [`StaticDocumentCache::refresh`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// The mtime matched; the cached text was reused without touching the file.
    Cached,
    /// The file was (re-)read from disk.
    Reloaded,
    /// The file does not exist; the cached text is now empty.
    Missing,
}

/// Cache of a single text file keyed by its modification time.
#[derive(Debug)]
pub struct StaticDocumentCache {
    path: PathBuf,
    last_known_mtime: Option<SystemTime>,
    cached_text: String,
    missing: bool,
    /// Refreshes served from memory, for diagnostics.
    hits: u64,
    /// Refreshes that read the file, for diagnostics.
    reloads: u64,
}

impl StaticDocumentCache {
    /// Create an empty cache for `path`. Nothing is read until the first
    /// [`refresh`](Self::refresh).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_known_mtime: None,
            cached_text: String::new(),
            missing: false,
            hits: 0,
            reloads: 0,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bring the cached text up to date with the file.
    ///
    /// On error the cache is left exactly as it was, so the next call retries
    /// from the same state.
    pub fn refresh(&mut self) -> Result<DocumentStatus, RefreshError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.last_known_mtime = None;
                self.cached_text.clear();
                self.missing = true;
                return Ok(DocumentStatus::Missing);
            }
            Err(source) => {
                return Err(RefreshError::DocumentStat {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mtime = metadata
            .modified()
            .map_err(|source| RefreshError::DocumentStat {
                path: self.path.clone(),
                source,
            })?;

        if self.last_known_mtime == Some(mtime) {
            self.hits += 1;
            return Ok(DocumentStatus::Cached);
        }

        let text = fs::read_to_string(&self.path).map_err(|source| RefreshError::DocumentRead {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            path = %self.path.display(),
            bytes = text.len(),
            "static document reloaded"
        );
        self.cached_text = text;
        self.last_known_mtime = Some(mtime);
        self.missing = false;
        self.reloads += 1;
        Ok(DocumentStatus::Reloaded)
    }

    /// Refresh and return the current text.
    pub fn read(&mut self) -> Result<&str, RefreshError> {
        self.refresh()?;
        Ok(self.text())
    }

    /// The text as of the last successful refresh.
    pub fn text(&self) -> &str {
        &self.cached_text
    }

    /// Whether the last refresh found the file missing.
    pub fn is_missing(&self) -> bool {
        self.missing
    }

    /// Modification time recorded at the last read, if any.
    pub fn last_known_mtime(&self) -> Option<SystemTime> {
        self.last_known_mtime
    }

    /// Number of refreshes answered from memory.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of refreshes that read the file.
    pub fn reloads(&self) -> u64 {
        self.reloads
    }
}
