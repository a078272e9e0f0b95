//! Background service that keeps the active system prompt file up to date.
//!
//! # Examples
//!
//! ```sh
//! # Refresh every 10 seconds until Ctrl-C
//! dynprompt --base-prompt base_system_prompt.txt --output system_prompt.txt
//!
//! # Settings from a file, one publication, then exit
//! dynprompt --config dynprompt.json --once
//! ```

use clap::Parser;
use dynprompt::prelude::*;
use dynprompt_daemon::{DaemonArgs, init_tracing};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let args = DaemonArgs::parse();
    init_tracing();

    let config = match args.build_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let service = RefreshService::new(config);

    if args.once {
        match service.publish_once() {
            Ok(outcome) if outcome.is_fully_published() => {}
            Ok(_) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let handle = match service.spawn() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
    }
    info!("Shutting down");

    match handle.shutdown().await {
        Ok(ticks) => info!("Published {ticks} time(s)"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
