//! Patch application
//!
//! Patches are fetched next to the tree they apply to and applied with
//! `patch -pN`. A `<file>.done` marker (`<file>.done_past_conf` for
//! post-configure patches) records that a patch was handled.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::defaults::{PATCH_DONE_POST_SUFFIX, PATCH_DONE_SUFFIX};
use crate::core::catalog::{url_basename, Node};
use crate::core::recipe::PatchSpec;
use crate::error::PatchError;
use crate::infra::download::Fetcher;
use crate::infra::filesystem;
use crate::infra::process::{run_checked, run_tolerant, CommandRunner, EnvOverlay, Invocation};

/// When a patch is applied relative to configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchPhase {
    /// Failure is fatal; applying one invalidates configure
    PreConfigure,
    /// Failure is logged; re-application commonly collides harmlessly
    PostConfigure,
}

impl PatchPhase {
    fn of(patch: &PatchSpec) -> Self {
        if patch.post_configure {
            Self::PostConfigure
        } else {
            Self::PreConfigure
        }
    }

    fn marker_suffix(self) -> &'static str {
        match self {
            Self::PreConfigure => PATCH_DONE_SUFFIX,
            Self::PostConfigure => PATCH_DONE_POST_SUFFIX,
        }
    }
}

/// Applies a node's patch list
pub struct PatchApplier<'a> {
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetcher,
}

impl<'a> PatchApplier<'a> {
    pub fn new(runner: &'a dyn CommandRunner, fetcher: &'a dyn Fetcher) -> Self {
        Self { runner, fetcher }
    }

    /// Apply every patch of `phase` not applied yet; returns how many were applied now
    pub fn apply(
        &self,
        node: &Node,
        source_dir: &Path,
        phase: PatchPhase,
        env: &EnvOverlay,
    ) -> Result<usize, PatchError> {
        let mut applied = 0;
        for patch in node.patches.iter().filter(|p| PatchPhase::of(p) == phase) {
            if self.apply_one(patch, source_dir, phase, env)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn apply_one(
        &self,
        patch: &PatchSpec,
        source_dir: &Path,
        phase: PatchPhase,
        env: &EnvOverlay,
    ) -> Result<bool, PatchError> {
        let dir = patch_dir(patch, source_dir);
        let file_name = url_basename(&patch.url);
        let file = dir.join(file_name);

        if !file.is_file() {
            filesystem::create_dir_all(&dir)?;
            info!("Downloading patch '{}'", patch.url);
            self.fetcher
                .fetch(&patch.url, &file)
                .map_err(|source| PatchError::Fetch {
                    url: patch.url.clone(),
                    source,
                })?;
        }

        let marker = marker_path(patch, source_dir, phase);
        if marker.is_file() {
            debug!("Patch '{file_name}' already applied");
            return Ok(false);
        }

        info!("Applying patch '{file_name}'");
        let command = match phase {
            PatchPhase::PreConfigure => format!("patch -p{} < \"{file_name}\"", patch.strip),
            PatchPhase::PostConfigure => format!("patch -N -p{} < \"{file_name}\"", patch.strip),
        };
        let invocation = Invocation::new(command, &dir).with_env(env);

        match phase {
            PatchPhase::PreConfigure => {
                run_checked(self.runner, &invocation).map_err(|source| PatchError::ApplyFailed {
                    url: patch.url.clone(),
                    source,
                })?;
            }
            PatchPhase::PostConfigure => {
                if !run_tolerant(self.runner, &invocation) {
                    warn!("Post-configure patch '{file_name}' did not apply cleanly, continuing");
                }
            }
        }

        filesystem::touch(&marker)?;
        Ok(true)
    }

    /// Forget which post-configure patches were applied so a fresh configure re-applies them
    pub fn reset_post_configure(&self, node: &Node, source_dir: &Path) -> Result<(), PatchError> {
        for patch in node.patches.iter().filter(|p| p.post_configure) {
            filesystem::remove_file(&marker_path(patch, source_dir, PatchPhase::PostConfigure))?;
        }
        Ok(())
    }
}

fn patch_dir(patch: &PatchSpec, source_dir: &Path) -> PathBuf {
    match &patch.subdir {
        Some(sub) => source_dir.join(sub),
        None => source_dir.to_path_buf(),
    }
}

fn marker_path(patch: &PatchSpec, source_dir: &Path, phase: PatchPhase) -> PathBuf {
    patch_dir(patch, source_dir).join(format!(
        "{}{}",
        url_basename(&patch.url),
        phase.marker_suffix()
    ))
}
