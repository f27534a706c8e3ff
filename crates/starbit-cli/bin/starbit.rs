//! starbit binary entry point.
//!
//! Parses arguments, initializes logging on stderr, validates the
//! configuration, and runs the selected command against stdout.

use anyhow::Result;
use starbit_cli::{CliConfig, commands};
use std::sync::atomic::AtomicBool;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = CliConfig::from_args();
    tracing::debug!(
        "Configuration loaded: names={:?}, threads={}, json={}",
        config.names_file,
        config.threads,
        config.json
    );
    config.validate()?;

    let stop = AtomicBool::new(false);
    let stdout = std::io::stdout();
    commands::run(&config, &stop, &mut stdout.lock())
}
