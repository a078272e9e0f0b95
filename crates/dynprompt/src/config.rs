//! Refresh engine configuration with sensible defaults.
//!
//! [`RefreshConfig`] can be built in code (defaults plus `with_*` setters) or
//! loaded from a JSON file with [`RefreshConfig::from_json_file`]. Missing
//! keys in the file fall back to the defaults.
//!
//! ```json
//! {
//!   "base_prompt_path": "prompts/base_system_prompt.txt",
//!   "output_path": "prompts/system_prompt.txt",
//!   "refresh_interval_secs": 10,
//!   "fragments": {
//!     "long_convo_addition": "Let the weariness of a long conversation show.",
//!     "short_convo_addition": "Embrace the novelty of our exchange."
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RefreshError;

/// File name of the audit log when none is configured. It sits next to the
/// current-artifact file.
pub const DEFAULT_AUDIT_LOG_NAME: &str = "system_prompt_log.txt";

/// Counter value above which the long-conversation fragment is chosen.
pub const DEFAULT_LONG_CONVERSATION_THRESHOLD: u64 = 50;

/// The two auxiliary texts the selector chooses between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptFragments {
    /// Used once the conversation counter exceeds the threshold.
    pub long_convo_addition: String,
    /// Used up to and including the threshold.
    pub short_convo_addition: String,
}

impl Default for PromptFragments {
    fn default() -> Self {
        Self {
            long_convo_addition: "You have engaged deeply in the discussion. Let the accumulated \
                                  wisdom and weariness of a long conversation guide your next words."
                .to_string(),
            short_convo_addition: "Each new interaction brings fresh perspectives. Embrace the \
                                   novelty of our exchange."
                .to_string(),
        }
    }
}

/// Everything the refresh engine needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Static base document. Default: `base_system_prompt.txt`.
    pub base_prompt_path: PathBuf,
    /// Where the composed artifact is published. Default: `system_prompt.txt`.
    pub output_path: PathBuf,
    /// Audit log. Default: [`DEFAULT_AUDIT_LOG_NAME`] next to `output_path`.
    pub audit_log_path: Option<PathBuf>,
    /// Seconds between publications. Default: `10.0`.
    pub refresh_interval_secs: f64,
    /// Seconds between metric samples. Default: `5.0`.
    pub sample_interval_secs: f64,
    /// Default: [`DEFAULT_LONG_CONVERSATION_THRESHOLD`].
    pub long_conversation_threshold: u64,
    pub fragments: PromptFragments,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            base_prompt_path: PathBuf::from("base_system_prompt.txt"),
            output_path: PathBuf::from("system_prompt.txt"),
            audit_log_path: None,
            refresh_interval_secs: 10.0,
            sample_interval_secs: 5.0,
            long_conversation_threshold: DEFAULT_LONG_CONVERSATION_THRESHOLD,
            fragments: PromptFragments::default(),
        }
    }
}

impl RefreshConfig {
    /// Load a config from a JSON file. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RefreshError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RefreshError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            RefreshError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both intervals are usable.
    pub fn validate(&self) -> Result<(), RefreshError> {
        check_interval("refresh_interval_secs", self.refresh_interval_secs)?;
        check_interval("sample_interval_secs", self.sample_interval_secs)?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_interval_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }

    /// The configured audit log path, or the default next to `output_path`.
    pub fn audit_log_path(&self) -> PathBuf {
        match &self.audit_log_path {
            Some(p) => p.clone(),
            None => self.output_path.with_file_name(DEFAULT_AUDIT_LOG_NAME),
        }
    }

    pub fn with_base_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_prompt_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_audit_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log_path = Some(path.into());
        self
    }

    pub fn with_refresh_interval(mut self, every: Duration) -> Self {
        self.refresh_interval_secs = every.as_secs_f64();
        self
    }

    pub fn with_sample_interval(mut self, every: Duration) -> Self {
        self.sample_interval_secs = every.as_secs_f64();
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.long_conversation_threshold = threshold;
        self
    }

    pub fn with_fragments(mut self, fragments: PromptFragments) -> Self {
        self.fragments = fragments;
        self
    }
}

fn check_interval(name: &str, secs: f64) -> Result<(), RefreshError> {
    // Duration::from_secs_f64 panics on negative, NaN or overflowing input.
    if !secs.is_finite() || secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
        return Err(RefreshError::Config(format!(
            "{name} must be a positive number of seconds, got {secs}"
        )));
    }
    Ok(())
}
