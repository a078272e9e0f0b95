//! Daemon flags and their merge with the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dynprompt::config::RefreshConfig;
use dynprompt::error::RefreshError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keep a system prompt file up to date from a base document and live
/// conversation metrics.
#[derive(Debug, Parser)]
#[command(name = "dynprompt", version)]
pub struct DaemonArgs {
    /// JSON config file. Flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Static base document.
    #[arg(long)]
    pub base_prompt: Option<PathBuf>,

    /// Where the composed prompt is written.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Audit log. Defaults to `system_prompt_log.txt` next to the output.
    #[arg(long)]
    pub audit_log: Option<PathBuf>,

    /// Seconds between publications.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Seconds between metric samples.
    #[arg(long)]
    pub sample_interval: Option<f64>,

    /// Fragment used once the conversation is long.
    #[arg(long)]
    pub long_addition: Option<String>,

    /// Fragment used while the conversation is short.
    #[arg(long)]
    pub short_addition: Option<String>,

    /// Counter value above which the long fragment is used.
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Publish once and exit.
    #[arg(long)]
    pub once: bool,
}

impl DaemonArgs {
    /// Defaults, then the config file, then flags.
    pub fn build_config(&self) -> Result<RefreshConfig, RefreshError> {
        let mut config = match &self.config {
            Some(path) => RefreshConfig::from_json_file(path)?,
            None => RefreshConfig::default(),
        };

        if let Some(path) = &self.base_prompt {
            config = config.with_base_prompt_path(path);
        }
        if let Some(path) = &self.output {
            config = config.with_output_path(path);
        }
        if let Some(path) = &self.audit_log {
            config = config.with_audit_log_path(path);
        }
        if let Some(secs) = self.interval {
            config = config.with_refresh_interval(seconds("--interval", secs)?);
        }
        if let Some(secs) = self.sample_interval {
            config = config.with_sample_interval(seconds("--sample-interval", secs)?);
        }
        if let Some(text) = &self.long_addition {
            config.fragments.long_convo_addition = text.clone();
        }
        if let Some(text) = &self.short_addition {
            config.fragments.short_convo_addition = text.clone();
        }
        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }

        config.validate()?;
        Ok(config)
    }
}

fn seconds(flag: &str, secs: f64) -> Result<Duration, RefreshError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(RefreshError::Config(format!(
            "{flag} must be a positive number of seconds, got {secs}"
        ))),
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> DaemonArgs {
        DaemonArgs::parse_from(std::iter::once("dynprompt").chain(args.iter().copied()))
    }

    #[test]
    fn no_flags_gives_defaults() {
        let args = parse(&[]);
        assert!(!args.once);
        assert_eq!(args.build_config().unwrap(), RefreshConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--base-prompt",
            "/etc/base.txt",
            "--output",
            "/run/prompt.txt",
            "--interval",
            "2.5",
            "--threshold",
            "7",
            "--long-addition",
            "L",
        ])
        .build_config()
        .unwrap();

        assert_eq!(config.base_prompt_path, PathBuf::from("/etc/base.txt"));
        assert_eq!(config.output_path, PathBuf::from("/run/prompt.txt"));
        assert_eq!(config.refresh_interval(), Duration::from_millis(2500));
        assert_eq!(config.long_conversation_threshold, 7);
        assert_eq!(config.fragments.long_convo_addition, "L");
        assert_eq!(
            config.fragments.short_convo_addition,
            RefreshConfig::default().fragments.short_convo_addition
        );
        assert_eq!(
            config.audit_log_path(),
            PathBuf::from("/run/system_prompt_log.txt")
        );
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dynprompt.json");
        std::fs::write(
            &file,
            r#"{ "output_path": "from_file.txt", "refresh_interval_secs": 30, "long_conversation_threshold": 3 }"#,
        )
        .unwrap();

        let config = parse(&["--config", file.to_str().unwrap(), "--threshold", "9"])
            .build_config()
            .unwrap();
        assert_eq!(config.output_path, PathBuf::from("from_file.txt"));
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.long_conversation_threshold, 9);
    }

    #[test]
    fn bad_interval_is_a_config_error() {
        for bad in ["0", "NaN", "inf"] {
            let err = parse(&["--interval", bad]).build_config().unwrap_err();
            assert!(matches!(err, RefreshError::Config(_)));
            assert!(err.to_string().contains("--interval"));
        }
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = parse(&["--config", "/nonexistent/dynprompt.json"])
            .build_config()
            .unwrap_err();
        assert!(matches!(err, RefreshError::Config(_)));
    }

    #[test]
    fn once_flag() {
        assert!(parse(&["--once"]).once);
    }
}
