//! Configure, build and install stages
//!
//! Each stage renders its options, skips when its marker for that exact
//! option string exists, runs the recipe's commands through the
//! [`CommandRunner`] and writes the marker on success.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::catalog::Node;
use crate::core::context::BuildContext;
use crate::core::recipe::{BuildTool, RecipeKind};
use crate::core::stage::{fingerprint, Stage, StageTracker};
use crate::core::template::Template;
use crate::error::BuildError;
use crate::infra::filesystem;
use crate::infra::process::{run_checked, run_tolerant, CommandRunner, EnvOverlay, Invocation};

/// Entry points tried, in order, when an autotools tree has no `configure`
const BOOTSTRAP_SCRIPTS: &[&str] = &["bootstrap.sh", "autogen.sh", "buildconf", "bootstrap"];

/// One node prepared for a bitness: its directories and environment
#[derive(Debug, Clone)]
pub struct NodeJob<'a> {
    pub node: &'a Node,
    pub ctx: &'a BuildContext,
    /// Acquired tree
    pub node_dir: PathBuf,
    /// Where configure runs and markers live
    pub source_dir: PathBuf,
    /// Where build and install run
    pub build_dir: PathBuf,
    /// Environment overlay of every invocation
    pub env: EnvOverlay,
}

impl<'a> NodeJob<'a> {
    /// Lay out a node whose tree was acquired into `node_dir`
    pub fn new(node: &'a Node, ctx: &'a BuildContext, node_dir: PathBuf) -> Self {
        let source_dir = match &node.source_subfolder {
            Some(sub) => node_dir.join(sub),
            None => node_dir.clone(),
        };
        let build_dir = match &node.build_subdir {
            Some(sub) => source_dir.join(sub),
            None => source_dir.clone(),
        };
        let env = ctx.node_env(node, &source_dir);
        Self {
            node,
            ctx,
            node_dir,
            source_dir,
            build_dir,
            env,
        }
    }

    /// Marker store of this node
    pub fn tracker(&self) -> StageTracker {
        StageTracker::new(&self.source_dir)
    }

    /// Render a template as seen from `cwd`
    pub fn render(&self, template: &Template, cwd: &Path) -> String {
        template.render(&self.ctx.scope(&self.env, cwd))
    }

    /// Invocation carrying this node's environment
    pub fn invocation(&self, command: impl Into<String>, cwd: &Path) -> Invocation {
        Invocation::new(command, cwd).with_env(&self.env)
    }

    fn jobs(&self) -> String {
        format!("-j {}", self.ctx.cpu_count)
    }
}

fn join_command(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drives a node through configure, build and install
pub struct BuildPipeline<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn checked(
        &self,
        job: &NodeJob<'_>,
        stage: &'static str,
        command: String,
        cwd: &Path,
    ) -> Result<(), BuildError> {
        run_checked(self.runner, &job.invocation(command, cwd))
            .map(drop)
            .map_err(|source| BuildError::StageFailed { stage, source })
    }

    fn tolerant(&self, job: &NodeJob<'_>, command: String, cwd: &Path) {
        run_tolerant(self.runner, &job.invocation(command, cwd));
    }

    /// Run hook commands in order; any failure is fatal
    pub fn run_hooks(
        &self,
        job: &NodeJob<'_>,
        hooks: &[Template],
        cwd: &Path,
        stage: &'static str,
    ) -> Result<(), BuildError> {
        for hook in hooks {
            let command = job.render(hook, cwd);
            info!(node = %job.node.name(), "Running {stage} command: '{command}'");
            self.checked(job, stage, command, cwd)?;
        }
        Ok(())
    }

    /// Configure unless done with the current options; returns whether it ran
    ///
    /// A configure run drops every stage marker of the node first, so build
    /// and install follow it.
    pub fn configure(&self, job: &NodeJob<'_>) -> Result<bool, BuildError> {
        let node = job.node;
        let step = &node.configure;
        if !step.enabled {
            return Ok(false);
        }

        let dir = &job.source_dir;
        let options = job.render(&step.options, dir);
        let fp = fingerprint(node.name(), &options);
        let tracker = job.tracker();
        if tracker.is_complete(Stage::Configure, &fp) {
            debug!(node = %node.name(), "Already configured");
            return Ok(false);
        }
        tracker.invalidate_all()?;

        if step.bootstrap {
            self.bootstrap(job)?;
        }

        let default_command = match node.recipe {
            RecipeKind::Autotools => "./configure",
            RecipeKind::Cmake => "cmake",
            RecipeKind::Meson => "meson",
            RecipeKind::Waf => "./waf --color=yes configure",
            RecipeKind::None => return Ok(false),
        };
        if node.recipe == RecipeKind::Meson {
            job.ctx.write_meson_cross_file()?;
        }
        let command = step
            .command
            .as_ref()
            .map(|c| job.render(c, dir))
            .unwrap_or_else(|| default_command.to_string());

        info!(node = %node.name(), recipe = ?node.recipe, "Configuring with: {options}");
        self.checked(job, "configure", join_command(&[&command, &options]), dir)?;
        self.run_hooks(job, &node.hooks.post_configure, dir, "post-configure")?;

        if step.clean_after {
            let clean = match node.recipe {
                RecipeKind::Waf => Some(join_command(&["./waf --color=yes clean", &job.jobs()])),
                RecipeKind::Autotools => Some(join_command(&["make clean", &job.jobs()])),
                RecipeKind::Cmake => Some("make clean".to_string()),
                RecipeKind::Meson | RecipeKind::None => None,
            };
            if let Some(clean) = clean {
                self.tolerant(job, clean, dir);
            }
        }

        tracker.mark_complete(Stage::Configure, &fp)?;
        Ok(true)
    }

    fn bootstrap(&self, job: &NodeJob<'_>) -> Result<(), BuildError> {
        let dir = &job.source_dir;
        let command = match job.node.recipe {
            RecipeKind::Autotools if !dir.join("configure").is_file() => BOOTSTRAP_SCRIPTS
                .iter()
                .find(|script| dir.join(script).is_file())
                .map(|script| format!("./{script}"))
                .or_else(|| {
                    dir.join("configure.ac")
                        .is_file()
                        .then(|| "autoreconf -fiv".to_string())
                }),
            RecipeKind::Waf if !dir.join("waf").is_file() && dir.join("bootstrap.py").is_file() => {
                Some("./bootstrap.py".to_string())
            }
            _ => None,
        };

        match command {
            Some(command) => {
                info!(node = %job.node.name(), "Bootstrapping with '{command}'");
                self.checked(job, "bootstrap", command, dir)
            }
            None => Ok(()),
        }
    }

    /// Build unless done with the current options; returns whether it ran
    pub fn build(&self, job: &NodeJob<'_>) -> Result<bool, BuildError> {
        let node = job.node;
        let step = &node.build;
        if !step.enabled {
            return Ok(false);
        }

        let dir = &job.build_dir;
        let options = job.render(&step.options, dir);
        let fp = fingerprint(node.name(), &options);
        let tracker = job.tracker();
        if tracker.is_complete(Stage::Build, &fp) {
            debug!(node = %node.name(), "Already built");
            return Ok(false);
        }
        filesystem::create_dir_all(dir)?;

        if node.tool == BuildTool::Make && dir.join("configure").is_file() {
            self.tolerant(job, join_command(&["make clean", &job.jobs()]), dir);
        }

        let jobs = if step.serial { String::new() } else { job.jobs() };
        let command = match &step.command {
            Some(command) => join_command(&[&job.render(command, dir), &options]),
            None => {
                let tool = match node.tool {
                    BuildTool::Waf => "./waf --color=yes build",
                    other => other.command(),
                };
                join_command(&[tool, &options, &jobs])
            }
        };

        info!(node = %node.name(), tool = ?node.tool, "Building with: {options}");
        if step.fallback.is_empty() {
            self.checked(job, "build", command, dir)?;
        } else if !run_tolerant(self.runner, &job.invocation(command, dir)) {
            info!(node = %node.name(), "Build failed, running fallback commands");
            self.run_hooks(job, &step.fallback, dir, "build fallback")?;
        }

        self.run_hooks(job, &node.hooks.post_build, dir, "post-build")?;
        tracker.mark_complete(Stage::Build, &fp)?;
        Ok(true)
    }

    /// Install unless done with the current options; returns whether it ran
    pub fn install(&self, job: &NodeJob<'_>) -> Result<bool, BuildError> {
        let node = job.node;
        let step = &node.install;
        if !step.enabled {
            return Ok(false);
        }

        let dir = &job.build_dir;
        let options = job.render(&step.options, dir);
        let fp = fingerprint(node.name(), &options);
        let tracker = job.tracker();
        if tracker.is_complete(Stage::Install, &fp) {
            debug!(node = %node.name(), "Already installed");
            return Ok(false);
        }

        let tool = match node.tool {
            BuildTool::Waf => "./waf",
            other => other.command(),
        };
        let jobs = if node.build.serial { String::new() } else { job.jobs() };
        let target = job.render(&step.target, dir);

        info!(node = %node.name(), "Installing with: {options}");
        self.checked(job, "install", join_command(&[tool, &target, &options, &jobs]), dir)?;
        self.run_hooks(job, &node.hooks.post_install, dir, "post-install")?;
        tracker.mark_complete(Stage::Install, &fp)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Catalog, NodeId};
    use crate::core::context::Bitness;
    use crate::test_utils::RecordingRunner;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        ctx: BuildContext,
        dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(Bitness::Bits64, temp.path().to_path_buf())
            .with_cpu_count(4)
            .with_original_path("/usr/bin");
        let dir = temp.path().join("x86_64").join("n");
        std::fs::create_dir_all(&dir).unwrap();
        Fixture {
            _temp: temp,
            ctx,
            dir,
        }
    }

    fn node(extra: &str) -> Node {
        Catalog::from_toml(&format!("[dependencies.n]\nfolder_name = \"n\"\n{extra}"))
            .unwrap()
            .node(&NodeId::dependency("n"))
            .unwrap()
            .clone()
    }

    fn run_all(pipeline: &BuildPipeline<'_>, job: &NodeJob<'_>) -> Vec<Stage> {
        let mut ran = Vec::new();
        if pipeline.configure(job).unwrap() {
            ran.push(Stage::Configure);
        }
        if pipeline.build(job).unwrap() {
            ran.push(Stage::Build);
        }
        if pipeline.install(job).unwrap() {
            ran.push(Stage::Install);
        }
        ran
    }

    // ============================================
    // Unit Tests - Stage commands
    // ============================================

    #[test]
    fn test_autotools_commands() {
        let fx = fixture();
        std::fs::write(fx.dir.join("configure"), "").unwrap();
        let node = node("configure_options = \"--host={target_host}\"");
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new();

        let ran = run_all(&BuildPipeline::new(&runner), &job);

        assert_eq!(ran, vec![Stage::Configure, Stage::Build, Stage::Install]);
        assert_eq!(
            runner.commands(),
            vec![
                "./configure --host=x86_64-w64-mingw32",
                "make clean -j 4",
                "make clean -j 4",
                "make -j 4",
                "make install -j 4",
            ]
        );
        assert!(runner.invocations().iter().all(|i| i.env["CFLAGS"] == "-O3"));
    }

    #[test]
    fn test_second_run_is_idle() {
        let fx = fixture();
        let node = node("");
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new();
        let pipeline = BuildPipeline::new(&runner);

        run_all(&pipeline, &job);
        runner.clear();
        assert!(run_all(&pipeline, &job).is_empty());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_configure_option_change_reruns_everything() {
        let fx = fixture();
        let runner = RecordingRunner::new();
        let pipeline = BuildPipeline::new(&runner);

        let before = node("configure_options = \"--enable-a\"");
        run_all(&pipeline, &NodeJob::new(&before, &fx.ctx, fx.dir.clone()));

        let after = node("configure_options = \"--enable-b\"");
        let ran = run_all(&pipeline, &NodeJob::new(&after, &fx.ctx, fx.dir.clone()));
        assert_eq!(ran, vec![Stage::Configure, Stage::Build, Stage::Install]);
    }

    #[test]
    fn test_install_option_change_reruns_only_install() {
        let fx = fixture();
        let runner = RecordingRunner::new();
        let pipeline = BuildPipeline::new(&runner);

        let before = node("install_options = \"DESTDIR=/a\"");
        run_all(&pipeline, &NodeJob::new(&before, &fx.ctx, fx.dir.clone()));

        let after = node("install_options = \"DESTDIR=/b\"");
        let ran = run_all(&pipeline, &NodeJob::new(&after, &fx.ctx, fx.dir.clone()));
        assert_eq!(ran, vec![Stage::Install]);
    }

    #[test]
    fn test_cmake_and_meson_commands() {
        let fx = fixture();
        let runner = RecordingRunner::new();
        let pipeline = BuildPipeline::new(&runner);

        let cmake = node("recipe = \"cmake\"\nconfigure_options = \". {cmake_prefix_options}\"");
        pipeline
            .configure(&NodeJob::new(&cmake, &fx.ctx, fx.dir.clone()))
            .unwrap();
        let commands = runner.commands();
        assert!(commands[0].starts_with("cmake . -G\"Unix Makefiles\""));
        assert_eq!(commands[1], "make clean");

        let meson_dir = fx.dir.with_file_name("m");
        std::fs::create_dir_all(&meson_dir).unwrap();
        runner.clear();
        let meson = node("recipe = \"meson\"\nconfigure_options = \"--cross-file={meson_env_file} build\"\nbuild_subdir = \"build\"");
        let job = NodeJob::new(&meson, &fx.ctx, meson_dir);
        run_all(&pipeline, &job);
        let commands = runner.commands();
        assert!(commands[0].starts_with("meson --cross-file="));
        assert_eq!(commands[1], "ninja -j 4");
        assert_eq!(commands[2], "ninja install -j 4");
        assert!(fx.ctx.meson_env_file().is_file());
        assert!(runner.invocations()[1].cwd.ends_with("m/build"));
    }

    #[test]
    fn test_bootstrap_discovery() {
        let fx = fixture();
        std::fs::write(fx.dir.join("autogen.sh"), "").unwrap();
        std::fs::write(fx.dir.join("configure.ac"), "").unwrap();
        let runner = RecordingRunner::new();

        BuildPipeline::new(&runner)
            .configure(&NodeJob::new(&node(""), &fx.ctx, fx.dir.clone()))
            .unwrap();
        assert_eq!(runner.commands()[0], "./autogen.sh");
    }

    #[test]
    fn test_configure_failure_leaves_no_marker() {
        let fx = fixture();
        let node = node("");
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new().fail_on("./configure");

        let err = BuildPipeline::new(&runner).configure(&job).unwrap_err();
        assert!(matches!(err, BuildError::StageFailed { stage: "configure", .. }));
        assert!(!job.tracker().any_complete(Stage::Configure));
    }

    #[test]
    fn test_build_fallback_replaces_failure() {
        let fx = fixture();
        let node = node("needs_configure = false\nbuild_fallback = [\"touch fallback_ran\"]");
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new().fail_on("make -j");

        assert!(BuildPipeline::new(&runner).build(&job).unwrap());
        assert_eq!(runner.commands(), vec!["make -j 4", "touch fallback_ran"]);
    }

    #[test]
    fn test_serial_build_and_custom_target() {
        let fx = fixture();
        let node = node(
            "recipe = \"none\"\nserial_build = true\nbuild_options = \"PREFIX={target_prefix}\"\ninstall_target = \"install-lib\"",
        );
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new();

        let ran = run_all(&BuildPipeline::new(&runner), &job);
        assert_eq!(ran, vec![Stage::Build, Stage::Install]);
        let commands = runner.commands();
        assert!(commands[0].starts_with("make PREFIX="));
        assert!(!commands[0].contains("-j"));
        assert_eq!(commands[1], "make install-lib");
    }

    #[test]
    fn test_disabled_stages_skip() {
        let fx = fixture();
        let node = node("needs_configure = false\nneeds_build = false\nneeds_install = false");
        let runner = RecordingRunner::new();

        let ran = run_all(
            &BuildPipeline::new(&runner),
            &NodeJob::new(&node, &fx.ctx, fx.dir.clone()),
        );
        assert!(ran.is_empty());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_hooks_render_current_path() {
        let fx = fixture();
        let node = node("needs_configure = false\nrun_post_build = [\"echo {current_path}\"]");
        let job = NodeJob::new(&node, &fx.ctx, fx.dir.clone());
        let runner = RecordingRunner::new();

        BuildPipeline::new(&runner).build(&job).unwrap();
        assert_eq!(
            runner.commands()[1],
            format!("echo {}", fx.dir.display())
        );
    }
}
