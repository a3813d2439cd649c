//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::defaults;
use crate::core::settings::Settings;
use commands::Commands;
use output::OutputConfig;

/// Crossforge - incremental cross-compilation build orchestrator
///
/// Fetches, patches, configures, builds and installs catalog nodes into a
/// mingw-w64 cross prefix, skipping every stage that already succeeded.
#[derive(Parser, Debug)]
#[command(name = "crossforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file, created with defaults when missing
    #[arg(long, global = true, env = "CROSSFORGE_CONFIG", default_value = defaults::SETTINGS_FILE)]
    pub config: PathBuf,

    /// Catalog file
    #[arg(long, global = true, env = "CROSSFORGE_CATALOG", default_value = defaults::CATALOG_FILE)]
    pub catalog: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Verbosity from the flags, raised by `script.quiet` and `script.debug`
    ///
    /// An unreadable settings file is ignored here; the command reports it.
    pub fn output_config(&self) -> OutputConfig {
        let script = if self.config.is_file() {
            Settings::load(&self.config)
                .map(|s| s.script)
                .unwrap_or_default()
        } else {
            Default::default()
        };
        let verbose = if script.debug {
            self.verbose.max(1)
        } else {
            self.verbose
        };
        OutputConfig::new(self.quiet || script.quiet, verbose)
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let paths = commands::Paths {
            settings: self.config,
            catalog: self.catalog,
        };
        if let Some(cmd) = self.command {
            cmd.run(&paths).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_settings_debug_raises_verbosity() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("crossforge.toml");
        std::fs::write(&config, "[script]\ndebug = true\nquiet = true\n").unwrap();

        let cli = Cli::parse_from(["crossforge", "--config", config.to_str().unwrap(), "plan"]);
        let output = cli.output_config();
        assert!(output.quiet);
        assert_eq!(output.verbose, 1);
    }

    #[test]
    fn test_missing_settings_use_flags() {
        let cli = Cli::parse_from(["crossforge", "-vv", "--config", "/nonexistent/x.toml", "plan"]);
        assert_eq!(cli.output_config(), OutputConfig::new(false, 2));
    }
}
