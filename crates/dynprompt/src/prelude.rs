//! Convenience re-exports for common `dynprompt` types.
//!
//! ```ignore
//! use dynprompt::prelude::*;
//! ```
//!
//! Component internals (clock implementations, the document cache, the
//! composer) are left out; import those from their modules when needed.

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{PromptFragments, RefreshConfig};
pub use crate::error::RefreshError;

// ── Runtime ─────────────────────────────────────────────────────────
pub use crate::metrics::{ChatEvent, ChatRole, MetricsSampler, MetricsSnapshot};
pub use crate::publish::{LoopState, TickOutcome};
pub use crate::service::{RefreshHandle, RefreshService};

// ── Observability ───────────────────────────────────────────────────
pub use crate::events::{EventHandler, FnEventHandler, LoggingHandler, NoopHandler, RefreshEvent};
