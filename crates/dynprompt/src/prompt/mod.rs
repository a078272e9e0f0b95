//! Turning metrics and the base document into the published artifact.
//!
//! Two steps, both pure:
//!
//! 1. **[`ElementSelector`]** picks zero or more auxiliary fragments from a
//!    [`MetricsSnapshot`](crate::metrics::MetricsSnapshot).
//! 2. **[`ArtifactComposer`]** formats the snapshot, the fragments and the
//!    static document into one text artifact.

pub mod composer;
pub mod selector;

pub use composer::{ArtifactComposer, TIMESTAMP_FORMAT};
pub use selector::ElementSelector;
