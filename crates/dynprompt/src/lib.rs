//! Periodic system prompt composition.
//!
//! `dynprompt` keeps a system prompt file up to date for a chat application.
//! Every refresh interval it combines a static base document, the live
//! conversation metrics and one auxiliary fragment chosen from those metrics
//! into a single text artifact. The artifact replaces the current prompt file
//! atomically and is appended to an audit log.
//!
//! Two tokio tasks do the work: a sampler that derives metrics from the clock
//! and a publisher that composes and writes artifacts. They share nothing but
//! the [`MetricsSampler`](metrics::MetricsSampler).
//!
//! # Getting started
//!
//! ```ignore
//! use dynprompt::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RefreshError> {
//!     let config = RefreshConfig::default()
//!         .with_base_prompt_path("prompts/base_system_prompt.txt")
//!         .with_output_path("prompts/system_prompt.txt");
//!
//!     let handle = RefreshService::new(config).spawn()?;
//!
//!     // Feed chat traffic in from the endpoint.
//!     handle.ingest(&ChatEvent::user("Hello there"));
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     let ticks = handle.shutdown().await?;
//!     println!("published {ticks} time(s)");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`metrics`] | [`MetricsSampler`](metrics::MetricsSampler), snapshots, clocks, chat events |
//! | [`document`] | [`StaticDocumentCache`](document::StaticDocumentCache): mtime-keyed cache of the base document |
//! | [`prompt`] | [`ElementSelector`](prompt::ElementSelector) and [`ArtifactComposer`](prompt::ArtifactComposer) |
//! | [`publish`] | [`PublicationLoop`](publish::PublicationLoop) and [`ArtifactStore`](publish::ArtifactStore) |
//! | [`events`] | [`EventHandler`](events::EventHandler) observability hooks |
//! | [`service`] | [`RefreshService`](service::RefreshService) composition root |
//! | [`config`] | [`RefreshConfig`](config::RefreshConfig), JSON loading and defaults |
//! | [`error`] | [`RefreshError`](error::RefreshError) |

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod metrics;
pub mod prelude;
pub mod prompt;
pub mod publish;
pub mod service;

pub use error::RefreshError;
