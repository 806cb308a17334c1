//! # multilog CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Single-event and streaming dispatch
//! - Remote connection setup from the environment

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{Cli, Commands};
use commands::{run_emit, run_info, run_pipe, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(observability::ObservabilityConfig::for_verbosity(
        cli.verbose,
        cli.quiet,
        cli.log_format.into(),
    ))?;

    debug!(version = env!("CARGO_PKG_VERSION"), "multilog starting");

    let result = match &cli.command {
        Commands::Emit(args) => run_emit(args).await,
        Commands::Pipe(args) => run_pipe(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
