//! Build orchestration
//!
//! Resolves the requested roots into a build order, then drives every node
//! of that order through acquisition, patching and the build pipeline, once
//! per bitness. Nodes run strictly one after another; the first fatal error
//! stops the run.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::core::acquire::SourceAcquirer;
use crate::core::catalog::{Catalog, Node, NodeId};
use crate::core::context::{Bitness, BuildContext};
use crate::core::patch::{PatchApplier, PatchPhase};
use crate::core::pipeline::{BuildPipeline, NodeJob};
use crate::core::resolver::DependencyGraph;
use crate::core::stage::Stage;
use crate::error::{CatalogError, ForgeError};
use crate::infra::download::Fetcher;
use crate::infra::process::{run_checked, CommandRunner};
use crate::infra::vcs;

/// What to build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Requested nodes, in request order
    pub roots: Vec<NodeId>,
    /// Build the roots only, not their dependencies
    pub skip_deps: bool,
    /// Reset the roots before building them
    pub force: bool,
}

/// Stages a node actually ran in one context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub bitness: Bitness,
    pub node: NodeId,
    pub stages: Vec<Stage>,
}

/// Top-level driver over a validated catalog
pub struct Orchestrator<'a> {
    catalog: &'a Catalog,
    graph: DependencyGraph,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator; fails if the catalog's dependency graph has a cycle
    pub fn new(
        catalog: &'a Catalog,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetcher,
    ) -> Result<Self, CatalogError> {
        let graph = DependencyGraph::from_catalog(catalog);
        graph.validate()?;
        Ok(Self {
            catalog,
            graph,
            runner,
            fetcher,
        })
    }

    /// Nodes `request` builds, in order
    pub fn plan(&self, request: &BuildRequest) -> Result<Vec<&'a Node>, CatalogError> {
        let catalog = self.catalog;
        self.graph
            .resolve_order(&request.roots, request.skip_deps)?
            .iter()
            .map(|id| {
                catalog.node(id).ok_or_else(|| CatalogError::UnknownNode {
                    kind: id.kind.label(),
                    name: id.name.clone(),
                })
            })
            .collect()
    }

    /// Build `request` in every context, in the given order
    pub fn run(
        &self,
        contexts: &[BuildContext],
        request: &BuildRequest,
    ) -> Result<Vec<NodeReport>, ForgeError> {
        let order = self.plan(request)?;
        let forced: HashSet<&NodeId> = if request.force {
            request.roots.iter().collect()
        } else {
            HashSet::new()
        };

        let mut reports = Vec::new();
        for ctx in contexts {
            info!(
                "Starting {} build of {} node(s) in '{}'",
                ctx.bitness,
                order.len(),
                ctx.work_dir.display()
            );
            ctx.init_dirs()?;
            ctx.check_toolchain();

            // Per context: the next bitness rebuilds everything in its own tree
            let mut already_built: HashSet<&NodeId> = HashSet::new();
            for node in &order {
                if !already_built.insert(&node.id) {
                    debug!(node = %node.name(), "Already built in this run");
                    continue;
                }
                let stages = self
                    .build_node(ctx, node, forced.contains(&node.id))
                    .map_err(|e| e.in_node(node.name(), ctx.node_dir(node)))?;
                reports.push(NodeReport {
                    bitness: ctx.bitness,
                    node: node.id.clone(),
                    stages,
                });
            }
            info!("Finished {} build", ctx.bitness);
        }
        Ok(reports)
    }

    /// Take one node through every stage it still needs; returns the stages that ran
    pub fn build_node(
        &self,
        ctx: &BuildContext,
        node: &Node,
        force: bool,
    ) -> Result<Vec<Stage>, ForgeError> {
        let name = node.name();
        for warning in &node.warnings {
            warn!(node = %name, "{warning}");
        }
        info!(node = %name, kind = node.id.kind.label(), "Processing");

        let acquirer = SourceAcquirer::new(self.runner, self.fetcher);
        let patcher = PatchApplier::new(self.runner, self.fetcher);
        let pipeline = BuildPipeline::new(self.runner);

        let acquired = acquirer.acquire(node, &ctx.node_root(node.id.kind))?;
        if !node.headers.is_empty() {
            acquirer.fetch_headers(&node.headers, &ctx.target_prefix().join("include"))?;
        }

        let job = NodeJob::new(node, ctx, acquired.dir);
        let tracker = job.tracker();
        if acquired.updated {
            info!(node = %name, "Source changed upstream, dropping stage markers");
            tracker.invalidate_all()?;
        }
        if force {
            self.reset(&job, &patcher)?;
        }

        // Hooks rerun until the first stage the node actually runs has a marker
        let hooks_done = |stages: &[Stage]| {
            stages
                .iter()
                .find(|stage| stage_enabled(node, **stage))
                .is_some_and(|stage| tracker.any_complete(*stage))
        };
        if !hooks_done(&Stage::ALL[..]) {
            pipeline.run_hooks(&job, &node.hooks.pre_patch, &job.node_dir, "pre-patch")?;
        }
        let applied = patcher.apply(node, &job.source_dir, PatchPhase::PreConfigure, &job.env)?;
        if applied > 0 {
            debug!(node = %name, applied, "New patches, reconfiguring");
            tracker.invalidate_all()?;
        }
        if !hooks_done(&[Stage::Build, Stage::Install][..]) {
            pipeline.run_hooks(&job, &node.hooks.post_patch, &job.source_dir, "post-patch")?;
        }

        let mut stages = Vec::new();
        if pipeline.configure(&job)? {
            stages.push(Stage::Configure);
            patcher.reset_post_configure(node, &job.source_dir)?;
        }
        patcher.apply(node, &job.source_dir, PatchPhase::PostConfigure, &job.env)?;
        if pipeline.build(&job)? {
            stages.push(Stage::Build);
        }
        if pipeline.install(&job)? {
            stages.push(Stage::Install);
        }

        if stages.is_empty() {
            info!(node = %name, "Up to date");
        } else {
            info!(node = %name, ?stages, "Done");
        }
        Ok(stages)
    }

    /// Forget every stage result and restore a pristine checkout
    fn reset(&self, job: &NodeJob<'_>, patcher: &PatchApplier<'_>) -> Result<(), ForgeError> {
        info!(node = %job.node.name(), "Forcing rebuild");
        job.tracker().invalidate_all()?;
        patcher.reset_post_configure(job.node, &job.source_dir)?;

        if job.node_dir.join(".git").exists() {
            vcs::git_clean_tree(self.runner, &job.node_dir)?;
            run_checked(
                self.runner,
                &job.invocation("git submodule update --init --recursive", &job.node_dir),
            )?;
        }
        Ok(())
    }
}

fn stage_enabled(node: &Node, stage: Stage) -> bool {
    match stage {
        Stage::Configure => node.configure.enabled,
        Stage::Build => node.build.enabled,
        Stage::Install => node.install.enabled,
    }
}
