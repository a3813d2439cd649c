//! Build command implementation
//!
//! Implements `crossforge build`: resolves the selection, then runs the
//! orchestrator once per configured bitness on a blocking thread.

use anyhow::{Context, Result};
use tokio::runtime::Handle;

use super::{Paths, Selection};
use crate::cli::output::status;
use crate::core::context::BuildContext;
use crate::core::orchestrator::{BuildRequest, NodeReport, Orchestrator};
use crate::infra::download::{DownloadManager, HttpFetcher};
use crate::infra::process::{OutputMode, ShellRunner};

/// Build options
pub struct BuildOptions {
    /// Requested nodes
    pub selection: Selection,
    /// Reset the requested nodes first
    pub force: bool,
    /// Leave dependencies alone
    pub skip_deps: bool,
}

/// Execute the build command
pub async fn execute(paths: &Paths, options: BuildOptions) -> Result<()> {
    let (settings, base) = paths.load_settings()?;
    let catalog = paths.load_catalog()?;

    // Unknown names and bad bitnesses fail before anything runs
    let roots = options.selection.roots(&catalog, &settings)?;
    let contexts: Vec<BuildContext> = settings
        .bitnesses()?
        .into_iter()
        .map(|bitness| settings.context(bitness, &base))
        .collect();
    let request = BuildRequest {
        roots,
        skip_deps: options.skip_deps,
        force: options.force,
    };

    let mode = if settings.script.quiet {
        let log = settings.log_file(&base);
        tracing::info!("Command output goes to '{}'", log.display());
        OutputMode::Log(log)
    } else {
        OutputMode::Stream
    };
    let fetcher = HttpFetcher::new(
        DownloadManager::new(&settings.script.user_agent),
        Handle::current(),
    );

    let reports = tokio::task::spawn_blocking(move || -> Result<Vec<NodeReport>> {
        let runner = ShellRunner::new(mode);
        let orchestrator = Orchestrator::new(&catalog, &runner, &fetcher)?;
        Ok(orchestrator.run(&contexts, &request)?)
    })
    .await
    .context("Build task did not complete")??;

    let rebuilt = reports.iter().filter(|r| !r.stages.is_empty()).count();
    println!(
        "{} {} node build(s) finished, {rebuilt} ran at least one stage",
        status::SUCCESS,
        reports.len()
    );
    Ok(())
}
