//! Composition root for the refresh engine.
//!
//! [`RefreshService`] turns a [`RefreshConfig`] into running tasks. All
//! components are constructed here and handed to the tasks that own them;
//! nothing is global.
//!
//! ```ignore
//! let handle = RefreshService::new(config).spawn()?;
//! handle.ingest(&ChatEvent::user("hello"));
//! // ...
//! let ticks = handle.shutdown().await?;
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::RefreshConfig;
use crate::document::StaticDocumentCache;
use crate::error::RefreshError;
use crate::events::{EventHandler, LoggingHandler, RefreshEvent};
use crate::metrics::{ChatEvent, Clock, MetricsSampler, MetricsSnapshot, SystemClock};
use crate::prompt::{ArtifactComposer, ElementSelector};
use crate::publish::{FsArtifactStore, PublicationLoop, TickOutcome};

/// Builder for the sampler and publisher tasks.
pub struct RefreshService {
    config: RefreshConfig,
    clock: Arc<dyn Clock>,
    handler: Arc<dyn EventHandler>,
}

impl RefreshService {
    pub fn new(config: RefreshConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            handler: Arc::new(LoggingHandler),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Start the sampler and publisher tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Result<RefreshHandle, RefreshError> {
        self.config.validate()?;
        let sampler = Arc::new(MetricsSampler::with_clock(self.clock.clone()));
        let publisher = self.build_loop(sampler.clone());
        let cancel = CancellationToken::new();

        info!(
            base_prompt = %self.config.base_prompt_path.display(),
            output = %self.config.output_path.display(),
            every = ?self.config.refresh_interval(),
            "Starting prompt refresh"
        );

        let sampler_task = {
            let sampler = sampler.clone();
            let handler = self.handler.clone();
            let cancel = cancel.clone();
            let every = self.config.sample_interval();
            tokio::spawn(async move {
                sampler.run(every, cancel).await;
                handler.on_event(&RefreshEvent::SamplerStopped);
            })
        };

        let publisher_task =
            tokio::spawn(publisher.run(self.config.refresh_interval(), cancel.clone()));

        Ok(RefreshHandle {
            sampler,
            cancel,
            sampler_task,
            publisher_task,
        })
    }

    /// Take one sample and run exactly one tick, without spawning anything.
    pub fn publish_once(self) -> Result<TickOutcome, RefreshError> {
        self.config.validate()?;
        let sampler = Arc::new(MetricsSampler::with_clock(self.clock.clone()));
        sampler.sample();
        let mut publisher = self.build_loop(sampler);
        Ok(publisher.tick())
    }

    fn build_loop(&self, sampler: Arc<MetricsSampler>) -> PublicationLoop<FsArtifactStore> {
        let config = &self.config;
        let selector = ElementSelector::new(&config.fragments)
            .with_threshold(config.long_conversation_threshold);
        let store = FsArtifactStore::new(&config.output_path, config.audit_log_path());

        PublicationLoop::new(
            sampler,
            StaticDocumentCache::new(&config.base_prompt_path),
            selector,
            ArtifactComposer::new(),
            store,
        )
        .with_event_handler(self.handler.clone())
    }
}

/// Handle to a running [`RefreshService`].
///
/// Dropping the handle leaves the tasks running until the token is
/// cancelled; call [`shutdown`](Self::shutdown) to stop and join them.
pub struct RefreshHandle {
    sampler: Arc<MetricsSampler>,
    cancel: CancellationToken,
    sampler_task: JoinHandle<()>,
    publisher_task: JoinHandle<PublicationLoop<FsArtifactStore>>,
}

impl RefreshHandle {
    pub fn sampler(&self) -> &Arc<MetricsSampler> {
        &self.sampler
    }

    /// Forward a chat event to the sampler.
    pub fn ingest(&self, event: &ChatEvent) {
        self.sampler.ingest(event);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.sampler.snapshot()
    }

    /// Token shared by both tasks. Cancelling it stops them at their next
    /// wait.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop both tasks and wait for them. Returns the number of ticks the
    /// publisher ran.
    pub async fn shutdown(self) -> Result<u64, RefreshError> {
        self.cancel.cancel();
        let sampled = self.sampler_task.await;
        let publisher = self.publisher_task.await?;
        sampled?;
        Ok(publisher.ticks())
    }
}
