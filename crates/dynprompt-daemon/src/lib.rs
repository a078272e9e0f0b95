//! Command-line front end for the `dynprompt` refresh engine.
//!
//! The binary (`dynprompt`) is a thin wrapper: [`DaemonArgs`] parses flags,
//! [`DaemonArgs::build_config`] layers them over an optional JSON config file,
//! and the resulting [`RefreshConfig`](dynprompt::config::RefreshConfig) is
//! handed to [`RefreshService`](dynprompt::service::RefreshService).

pub mod args;

pub use args::{DaemonArgs, init_tracing};
