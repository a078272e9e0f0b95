//! Formatting of the published prompt artifact.
//!
//! An artifact always has four sections, in this order, joined by a single
//! blank line:
//!
//! ```text
//! Timestamp: 2024-06-01 10:30:00
//!
//! <fragment 1>
//! <fragment 2>
//!
//! Length of Conversation: 7
//!
//! <static document, verbatim>
//! ```
//!
//! The fragment section is kept even when there are no fragments, so the
//! layout of the artifact never shifts. The static document is trusted input
//! and is appended unmodified, trailing whitespace included.

use chrono::Local;

use crate::metrics::MetricsSnapshot;

/// `strftime` pattern for the timestamp line (local time, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECTION_SEPARATOR: &str = "\n\n";

/// Builds artifact text from its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactComposer {
    timestamp_label: String,
    counter_label: String,
}

impl Default for ArtifactComposer {
    fn default() -> Self {
        Self {
            timestamp_label: "Timestamp".to_string(),
            counter_label: "Length of Conversation".to_string(),
        }
    }
}

impl ArtifactComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the labels of the timestamp and counter lines.
    pub fn with_labels(
        mut self,
        timestamp_label: impl Into<String>,
        counter_label: impl Into<String>,
    ) -> Self {
        self.timestamp_label = timestamp_label.into();
        self.counter_label = counter_label.into();
        self
    }

    /// Compose one artifact.
    pub fn compose(
        &self,
        metrics: &MetricsSnapshot,
        fragments: &[String],
        static_text: &str,
    ) -> String {
        let timestamp = metrics
            .timestamp
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT);

        let sections = [
            format!("{}: {timestamp}", self.timestamp_label),
            fragments.join("\n"),
            format!("{}: {}", self.counter_label, metrics.derived_counter),
        ];

        let mut artifact = String::with_capacity(
            sections.iter().map(String::len).sum::<usize>() + static_text.len() + 6,
        );
        for section in &sections {
            artifact.push_str(section);
            artifact.push_str(SECTION_SEPARATOR);
        }
        artifact.push_str(static_text);
        artifact
    }
}
