//! Crossforge CLI - incremental cross-compilation build orchestrator
//!
//! Entry point for the crossforge command-line application.

use anyhow::Result;
use clap::Parser;

use crossforge::cli::output::display_error;
use crossforge::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flags and script settings decide the log level, RUST_LOG overrides both
    cli.output_config().install();
    tracing::debug!(
        commit = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        dirty = option_env!("VERGEN_GIT_DIRTY").unwrap_or("unknown"),
        built = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        "crossforge {}",
        env!("CARGO_PKG_VERSION")
    );

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
