mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

use crate::cli::Cli;

/// Log to stderr so `spapi report` output on stdout stays pure JSON.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    commands::run(cli.command)
}
