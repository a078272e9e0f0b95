//! Error type shared by the refresh engine.
//!
//! Every variant that comes from the filesystem keeps the offending path and
//! the underlying [`io::Error`] so log lines say exactly which file failed.
//! None of these errors stop a running loop: per-tick failures are reported
//! through [`TickOutcome`](crate::publish::TickOutcome) and
//! [`RefreshEvent`](crate::events::RefreshEvent) and the next tick retries.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to stat static document {}: {source}", .path.display())]
    DocumentStat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read static document {}: {source}", .path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write current artifact {}: {source}", .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to audit log {}: {source}", .path.display())]
    AuditAppend {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
