//! Live conversation metrics.
//!
//! [`MetricsSampler`] owns the one mutable [`MetricsSnapshot`] in the process.
//! The snapshot is a `Copy` value kept behind a mutex: every update builds a
//! complete new value and assigns it in one step, and every reader gets its
//! own copy. A reader therefore always sees a timestamp together with the
//! counter that was computed from the same clock reading.
//!
//! The sampler is driven by [`MetricsSampler::run`], a periodic task that
//! stops cleanly when its [`CancellationToken`] fires. Chat traffic can be
//! recorded with [`MetricsSampler::ingest`]; it does not affect the
//! time-derived counter.

pub mod clock;

pub use clock::{Clock, ClockReading, ManualClock, SystemClock};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shortest period accepted by [`MetricsSampler::run`].
const MIN_SAMPLE_PERIOD: Duration = Duration::from_millis(1);

/// An immutable copy of the metrics at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Wall-clock time of the sample.
    pub timestamp: DateTime<Utc>,
    /// Whole seconds elapsed since the sampler started. Never decreases.
    pub derived_counter: u64,
    /// Number of samples taken; `0` is the snapshot created at start-up.
    pub sequence: u64,
    /// Chat events recorded through [`MetricsSampler::ingest`].
    pub messages_ingested: u64,
}

impl MetricsSnapshot {
    fn initial(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            derived_counter: 0,
            sequence: 0,
            messages_ingested: 0,
        }
    }
}

/// Who produced a [`ChatEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A conversation event fed in by the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub role: ChatRole,
    pub text: String,
}

impl ChatEvent {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Periodically derives metrics from the clock and publishes them as
/// [`MetricsSnapshot`]s.
///
/// Share it between tasks with an `Arc`; all methods take `&self`.
pub struct MetricsSampler {
    clock: Arc<dyn Clock>,
    started: Instant,
    live: Mutex<MetricsSnapshot>,
}

impl std::fmt::Debug for MetricsSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSampler")
            .field("started", &self.started)
            .field("live", &self.snapshot())
            .finish()
    }
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSampler {
    /// Create a sampler backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a sampler backed by a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock,
            started: start.monotonic,
            live: Mutex::new(MetricsSnapshot::initial(start.wall)),
        }
    }

    /// Copy of the current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.lock()
    }

    /// Take one sample now and publish it.
    ///
    /// The clock is read while the lock is held, so concurrent samples are
    /// serialized and the counter cannot go backwards.
    pub fn sample(&self) -> MetricsSnapshot {
        let mut live = self.lock();
        let reading = self.clock.now();
        let elapsed = reading.monotonic.saturating_duration_since(self.started);
        let next = MetricsSnapshot {
            timestamp: reading.wall,
            derived_counter: elapsed.as_secs(),
            sequence: live.sequence + 1,
            messages_ingested: live.messages_ingested,
        };
        *live = next;
        next
    }

    /// Record a chat event.
    pub fn ingest(&self, event: &ChatEvent) {
        let mut live = self.lock();
        *live = MetricsSnapshot {
            messages_ingested: live.messages_ingested + 1,
            ..*live
        };
        debug!(
            role = ?event.role,
            chars = event.text.chars().count(),
            total = live.messages_ingested,
            "chat event ingested"
        );
    }

    /// Sample every `every` until `cancel` fires.
    ///
    /// The first sample is taken one period after the call; the snapshot
    /// created at construction covers the time before that. Cancellation is
    /// only observed while waiting, never in the middle of a sample.
    pub async fn run(&self, every: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(every.max(MIN_SAMPLE_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let snapshot = self.sample();
            debug!(
                counter = snapshot.derived_counter,
                sequence = snapshot.sequence,
                "metrics sampled"
            );
        }

        debug!("metrics sampler stopped");
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}
