//! Threshold rule choosing the auxiliary prompt fragment.

use tracing::debug;

use crate::config::{DEFAULT_LONG_CONVERSATION_THRESHOLD, PromptFragments};
use crate::metrics::MetricsSnapshot;

/// Picks the long- or short-conversation fragment based on the counter.
///
/// The result is a list so richer rules can return several fragments; this
/// rule returns at most one.
///
/// # Example
///
/// ```ignore
/// let selector = ElementSelector::new(&PromptFragments {
///     long_convo_addition: "Long".into(),
///     short_convo_addition: "Short".into(),
/// });
/// assert_eq!(selector.select(&snapshot_with_counter(51)), vec!["Long"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSelector {
    long: String,
    short: String,
    threshold: u64,
}

impl ElementSelector {
    pub fn new(fragments: &PromptFragments) -> Self {
        Self {
            long: fragments.long_convo_addition.clone(),
            short: fragments.short_convo_addition.clone(),
            threshold: DEFAULT_LONG_CONVERSATION_THRESHOLD,
        }
    }

    /// Counter values strictly above `threshold` select the long fragment.
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Fragments for the given metrics. Empty if the chosen text is empty.
    pub fn select(&self, metrics: &MetricsSnapshot) -> Vec<String> {
        let long = metrics.derived_counter > self.threshold;
        let chosen = if long { &self.long } else { &self.short };
        debug!(
            counter = metrics.derived_counter,
            threshold = self.threshold,
            long,
            "prompt fragment selected"
        );
        if chosen.is_empty() {
            Vec::new()
        } else {
            vec![chosen.clone()]
        }
    }
}
