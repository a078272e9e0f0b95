//! Observability events emitted by the refresh loops.
//!
//! Nothing in the refresh engine surfaces errors to a user. Instead every
//! degraded condition and every publication is reported as a
//! [`RefreshEvent`] to an [`EventHandler`], which decides what to do with it:
//! log it, count it, forward it to a metrics system.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or silent runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` (the default) |
//! | [`FnEventHandler`] | Quick closures, e.g. collecting events in tests |
//! | Custom `impl EventHandler` | Metrics, alerting |

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::RefreshError;

/// Events emitted by [`PublicationLoop`](crate::publish::PublicationLoop)
/// and the service wiring around it.
#[derive(Debug)]
pub enum RefreshEvent<'a> {
    /// The static document was read from disk.
    DocumentReloaded { path: &'a Path, bytes: usize },
    /// The static document does not exist; empty text is used this tick.
    DocumentMissing { path: &'a Path },
    /// The static document could not be read; nothing was published.
    TickSkipped { tick: u64, error: &'a RefreshError },
    /// The current-artifact file was replaced.
    ArtifactWritten { tick: u64, path: &'a Path, bytes: usize },
    /// Replacing the current-artifact file failed.
    ArtifactWriteFailed { tick: u64, error: &'a RefreshError },
    /// The artifact was appended to the audit log.
    AuditAppended { tick: u64, path: &'a Path },
    /// Appending to the audit log failed.
    AuditAppendFailed { tick: u64, error: &'a RefreshError },
    /// The publication loop exited after `ticks` ticks.
    PublisherStopped { ticks: u64 },
    /// The metrics sampler task exited.
    SamplerStopped,
}

impl RefreshEvent<'_> {
    /// The error carried by a failure event, if any.
    pub fn error(&self) -> Option<&RefreshError> {
        match self {
            RefreshEvent::TickSkipped { error, .. }
            | RefreshEvent::ArtifactWriteFailed { error, .. }
            | RefreshEvent::AuditAppendFailed { error, .. } => Some(*error),
            _ => None,
        }
    }
}

/// Receiver of [`RefreshEvent`]s.
///
/// Called synchronously from inside a tick, so implementations should be
/// quick and must not block.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &RefreshEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let failures = Arc::new(AtomicUsize::new(0));
/// let counter = failures.clone();
/// let handler = FnEventHandler::new(move |event| {
///     if event.error().is_some() {
///         counter.fetch_add(1, Ordering::Relaxed);
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&RefreshEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&RefreshEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&RefreshEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RefreshEvent<'_>) {
        (self.0)(event)
    }
}

/// Logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &RefreshEvent<'_>) {
        match event {
            RefreshEvent::DocumentReloaded { path, bytes } => {
                debug!("Base prompt reloaded from {} ({bytes} bytes)", path.display());
            }
            RefreshEvent::DocumentMissing { path } => {
                warn!(
                    "Base prompt does not exist: {} (using empty text)",
                    path.display()
                );
            }
            RefreshEvent::TickSkipped { tick, error } => {
                warn!("Tick {tick} skipped: {error}");
            }
            RefreshEvent::ArtifactWritten { tick, path, bytes } => {
                info!(tick, bytes, "Prompt updated → {}", path.display());
            }
            RefreshEvent::ArtifactWriteFailed { tick, error } => {
                warn!("Tick {tick}: {error}");
            }
            RefreshEvent::AuditAppended { tick, path } => {
                debug!("Tick {tick}: prompt logged to {}", path.display());
            }
            RefreshEvent::AuditAppendFailed { tick, error } => {
                warn!("Tick {tick}: {error}");
            }
            RefreshEvent::PublisherStopped { ticks } => {
                info!("Prompt publisher stopped after {ticks} tick(s)");
            }
            RefreshEvent::SamplerStopped => {
                info!("Metrics sampler stopped");
            }
        }
    }
}
