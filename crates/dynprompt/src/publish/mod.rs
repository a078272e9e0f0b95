//! The periodic publication loop.
//!
//! Each tick of [`PublicationLoop`] runs the whole pipeline once:
//!
//! ```text
//! MetricsSampler::snapshot ─┐
//!                           ├─▶ ElementSelector ─▶ ArtifactComposer ─▶ write current ─▶ append audit
//! StaticDocumentCache::read ┘
//! ```
//!
//! A tick is a synchronous unit of work. [`PublicationLoop::run`] only checks
//! for cancellation while waiting for the next tick, so a started tick always
//! finishes. Failures are confined to the tick they happen in:
//!
//! - a document read error skips composing and publishing for that tick;
//! - a failed current-artifact write does not prevent the audit append, and
//!   the other way round;
//! - the next tick starts from scratch either way.

pub mod store;

pub use store::{AUDIT_SEPARATOR, ArtifactStore, FsArtifactStore};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::document::{DocumentStatus, StaticDocumentCache};
use crate::error::RefreshError;
use crate::events::{EventHandler, LoggingHandler, RefreshEvent};
use crate::metrics::MetricsSampler;
use crate::prompt::{ArtifactComposer, ElementSelector};

/// Shortest period accepted by [`PublicationLoop::run`].
const MIN_PUBLISH_PERIOD: Duration = Duration::from_millis(1);

/// Where the loop is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// Inside a tick.
    Publishing,
}

/// Result of one [`PublicationLoop::tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// An artifact was composed. Each write reports its own result.
    Published {
        tick: u64,
        artifact: String,
        current: Result<(), RefreshError>,
        audit: Result<(), RefreshError>,
    },
    /// The static document could not be read; nothing was written.
    Skipped { tick: u64, error: RefreshError },
}

impl TickOutcome {
    /// 1-based tick number.
    pub fn tick(&self) -> u64 {
        match self {
            TickOutcome::Published { tick, .. } | TickOutcome::Skipped { tick, .. } => *tick,
        }
    }

    /// The composed artifact, if the tick got that far.
    pub fn artifact(&self) -> Option<&str> {
        match self {
            TickOutcome::Published { artifact, .. } => Some(artifact),
            TickOutcome::Skipped { .. } => None,
        }
    }

    /// Whether both writes succeeded.
    pub fn is_fully_published(&self) -> bool {
        matches!(
            self,
            TickOutcome::Published {
                current: Ok(()),
                audit: Ok(()),
                ..
            }
        )
    }
}

/// Periodic driver that composes and publishes the artifact.
///
/// Owns everything it touches except the [`MetricsSampler`], which it shares
/// read-only with the sampler task.
pub struct PublicationLoop<S: ArtifactStore = FsArtifactStore> {
    sampler: Arc<MetricsSampler>,
    document: StaticDocumentCache,
    selector: ElementSelector,
    composer: ArtifactComposer,
    store: S,
    handler: Arc<dyn EventHandler>,
    state: LoopState,
    ticks: u64,
}

impl<S: ArtifactStore> PublicationLoop<S> {
    /// Assemble a loop from its parts. Events go to a [`LoggingHandler`]
    /// until [`with_event_handler`](Self::with_event_handler) says otherwise.
    pub fn new(
        sampler: Arc<MetricsSampler>,
        document: StaticDocumentCache,
        selector: ElementSelector,
        composer: ArtifactComposer,
        store: S,
    ) -> Self {
        Self {
            sampler,
            document,
            selector,
            composer,
            store,
            handler: Arc::new(LoggingHandler),
            state: LoopState::Idle,
            ticks: 0,
        }
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of ticks run so far, including skipped ones.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn document(&self) -> &StaticDocumentCache {
        &self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one publication cycle.
    pub fn tick(&mut self) -> TickOutcome {
        self.state = LoopState::Publishing;
        self.ticks += 1;
        let outcome = self.publish(self.ticks);
        self.state = LoopState::Idle;
        outcome
    }

    fn publish(&mut self, tick: u64) -> TickOutcome {
        let snapshot = self.sampler.snapshot();

        match self.document.refresh() {
            Ok(DocumentStatus::Cached) => {}
            Ok(DocumentStatus::Reloaded) => {
                self.handler.on_event(&RefreshEvent::DocumentReloaded {
                    path: self.document.path(),
                    bytes: self.document.text().len(),
                });
            }
            Ok(DocumentStatus::Missing) => {
                self.handler.on_event(&RefreshEvent::DocumentMissing {
                    path: self.document.path(),
                });
            }
            Err(error) => {
                self.handler
                    .on_event(&RefreshEvent::TickSkipped { tick, error: &error });
                return TickOutcome::Skipped { tick, error };
            }
        }

        let fragments = self.selector.select(&snapshot);
        let artifact = self
            .composer
            .compose(&snapshot, &fragments, self.document.text());

        let current = self.store.write_current(&artifact);
        match &current {
            Ok(()) => self.handler.on_event(&RefreshEvent::ArtifactWritten {
                tick,
                path: self.store.current_path(),
                bytes: artifact.len(),
            }),
            Err(error) => self
                .handler
                .on_event(&RefreshEvent::ArtifactWriteFailed { tick, error }),
        }

        let audit = self.store.append_audit(&artifact);
        match &audit {
            Ok(()) => self.handler.on_event(&RefreshEvent::AuditAppended {
                tick,
                path: self.store.audit_path(),
            }),
            Err(error) => self
                .handler
                .on_event(&RefreshEvent::AuditAppendFailed { tick, error }),
        }

        TickOutcome::Published {
            tick,
            artifact,
            current,
            audit,
        }
    }

    /// Publish now and then every `every` until `cancel` fires.
    ///
    /// Returns the loop so the caller can inspect it after shutdown.
    pub async fn run(mut self, every: Duration, cancel: CancellationToken) -> Self {
        let mut ticker = tokio::time::interval(every.max(MIN_PUBLISH_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.tick();
        }

        self.handler
            .on_event(&RefreshEvent::PublisherStopped { ticks: self.ticks });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptFragments;
    use crate::events::FnEventHandler;
    use crate::metrics::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// In-memory store that can be told to fail specific ticks.
    #[derive(Default)]
    struct MemoryStore {
        current: Option<String>,
        audit: Vec<String>,
        writes: u64,
        appends: u64,
        fail_write_on: Vec<u64>,
        fail_append_on: Vec<u64>,
        path: PathBuf,
    }

    impl ArtifactStore for MemoryStore {
        fn write_current(&mut self, artifact: &str) -> Result<(), RefreshError> {
            self.writes += 1;
            if self.fail_write_on.contains(&self.writes) {
                return Err(RefreshError::ArtifactWrite {
                    path: self.path.clone(),
                    source: std::io::Error::other("injected write failure"),
                });
            }
            self.current = Some(artifact.to_string());
            Ok(())
        }

        fn append_audit(&mut self, artifact: &str) -> Result<(), RefreshError> {
            self.appends += 1;
            if self.fail_append_on.contains(&self.appends) {
                return Err(RefreshError::AuditAppend {
                    path: self.path.clone(),
                    source: std::io::Error::other("injected append failure"),
                });
            }
            self.audit.push(artifact.to_string());
            Ok(())
        }

        fn current_path(&self) -> &Path {
            &self.path
        }

        fn audit_path(&self) -> &Path {
            &self.path
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        base: PathBuf,
        clock: Arc<ManualClock>,
        sampler: Arc<MetricsSampler>,
    }

    fn fixture(base_text: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base_system_prompt.txt");
        if let Some(text) = base_text {
            std::fs::write(&base, text).unwrap();
        }
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let sampler = Arc::new(MetricsSampler::with_clock(clock.clone()));
        Fixture {
            _dir: dir,
            base,
            clock,
            sampler,
        }
    }

    fn publication_loop(fx: &Fixture, store: MemoryStore) -> PublicationLoop<MemoryStore> {
        PublicationLoop::new(
            fx.sampler.clone(),
            StaticDocumentCache::new(&fx.base),
            ElementSelector::new(&PromptFragments {
                long_convo_addition: "LONG".into(),
                short_convo_addition: "SHORT".into(),
            }),
            ArtifactComposer::new(),
            store,
        )
        .with_event_handler(Arc::new(crate::events::NoopHandler))
    }

    #[test]
    fn tick_composes_and_publishes() {
        let fx = fixture(Some("BASE PROMPT"));
        let mut lp = publication_loop(&fx, MemoryStore::default());

        let outcome = lp.tick();
        assert!(outcome.is_fully_published());
        assert_eq!(outcome.tick(), 1);

        let artifact = outcome.artifact().unwrap();
        assert!(artifact.contains("\n\nSHORT\n\n"));
        assert!(artifact.contains("Length of Conversation: 0"));
        assert!(artifact.ends_with("BASE PROMPT"));

        assert_eq!(lp.store().current.as_deref(), Some(artifact));
        assert_eq!(lp.store().audit, vec![artifact.to_string()]);
        assert_eq!(lp.state(), LoopState::Idle);
    }

    #[test]
    fn tick_uses_latest_snapshot() {
        let fx = fixture(Some("B"));
        let mut lp = publication_loop(&fx, MemoryStore::default());

        fx.clock.advance(Duration::from_secs(51));
        fx.sampler.sample();

        let outcome = lp.tick();
        let artifact = outcome.artifact().unwrap();
        assert!(artifact.contains("\n\nLONG\n\n"));
        assert!(artifact.contains("Length of Conversation: 51"));
    }

    #[test]
    fn missing_document_publishes_empty_body() {
        let fx = fixture(None);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut lp = publication_loop(&fx, MemoryStore::default()).with_event_handler(Arc::new(
            FnEventHandler::new(move |event| sink.lock().unwrap().push(format!("{event:?}"))),
        ));

        let outcome = lp.tick();
        assert!(outcome.is_fully_published());
        assert!(outcome.artifact().unwrap().ends_with("Length of Conversation: 0\n\n"));
        assert!(lp.document().is_missing());

        let events = events.lock().unwrap();
        assert!(events[0].starts_with("DocumentMissing"));
    }

    #[test]
    fn unreadable_document_skips_tick_then_recovers() {
        let fx = fixture(None);
        // Not valid UTF-8.
        std::fs::write(&fx.base, [0xc3, 0x28]).unwrap();
        let mut lp = publication_loop(&fx, MemoryStore::default());

        let outcome = lp.tick();
        assert!(matches!(
            outcome,
            TickOutcome::Skipped {
                tick: 1,
                error: RefreshError::DocumentRead { .. }
            }
        ));
        assert!(lp.store().current.is_none());
        assert!(lp.store().audit.is_empty());

        std::fs::write(&fx.base, "repaired").unwrap();
        let outcome = lp.tick();
        assert!(outcome.is_fully_published());
        assert_eq!(outcome.tick(), 2);
        assert_eq!(lp.store().audit.len(), 1);
        assert_eq!(lp.ticks(), 2);
    }

    #[test]
    fn failed_write_does_not_block_append_or_next_tick() {
        let fx = fixture(Some("B"));
        let store = MemoryStore {
            fail_write_on: vec![2],
            ..Default::default()
        };
        let mut lp = publication_loop(&fx, store);

        lp.tick();
        fx.clock.advance(Duration::from_secs(1));
        fx.sampler.sample();
        let second = lp.tick();
        assert!(matches!(
            second,
            TickOutcome::Published {
                current: Err(RefreshError::ArtifactWrite { .. }),
                audit: Ok(()),
                ..
            }
        ));

        fx.clock.advance(Duration::from_secs(1));
        fx.sampler.sample();
        let third = lp.tick();
        assert!(third.is_fully_published());
        assert_eq!(lp.store().current.as_deref(), third.artifact());
        assert_eq!(lp.store().audit.len(), 3);
    }

    #[test]
    fn failed_append_does_not_block_write() {
        let fx = fixture(Some("B"));
        let store = MemoryStore {
            fail_append_on: vec![1],
            ..Default::default()
        };
        let mut lp = publication_loop(&fx, store);

        let first = lp.tick();
        assert!(matches!(
            first,
            TickOutcome::Published {
                current: Ok(()),
                audit: Err(RefreshError::AuditAppend { .. }),
                ..
            }
        ));
        assert_eq!(lp.store().current.as_deref(), first.artifact());

        assert!(lp.tick().is_fully_published());
        assert_eq!(lp.store().audit.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_publishes_immediately_and_every_period() {
        let fx = fixture(Some("B"));
        let lp = publication_loop(&fx, MemoryStore::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(lp.run(Duration::from_secs(10), cancel.clone()));
        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();
        let lp = task.await.unwrap();

        // t = 0, 10, 20
        assert_eq!(lp.ticks(), 3);
        assert_eq!(lp.store().audit.len(), 3);
        assert_eq!(lp.state(), LoopState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_without_ticking_when_already_cancelled() {
        let fx = fixture(Some("B"));
        let lp = publication_loop(&fx, MemoryStore::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let lp = lp.run(Duration::from_secs(10), cancel).await;
        assert_eq!(lp.ticks(), 0);
    }
}
