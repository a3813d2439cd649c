//! Per-bitness build context
//!
//! Holds the directory layout and toolchain naming for one target bitness,
//! supplies template field values, and computes the environment overlay each
//! node's invocations run with. Nothing here touches the process environment.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::defaults;
use crate::core::catalog::{Node, NodeKind};
use crate::core::template::{Field, FieldSource};
use crate::error::FilesystemError;
use crate::infra::filesystem;
use crate::infra::process::EnvOverlay;

/// Target architecture width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    Bits32,
    Bits64,
}

impl Bitness {
    /// Parse 32 or 64
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::Bits32),
            64 => Some(Self::Bits64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Architecture name used for directories and the host triple
    pub fn name(self) -> &'static str {
        match self {
            Self::Bits32 => "i686",
            Self::Bits64 => "x86_64",
        }
    }

    /// Alternate spelling some build systems expect
    pub fn name2(self) -> &'static str {
        match self {
            Self::Bits32 => "x86",
            Self::Bits64 => "x86_64",
        }
    }

    /// mingw flavour name
    pub fn name3(self) -> &'static str {
        match self {
            Self::Bits32 => "mingw",
            Self::Bits64 => "mingw64",
        }
    }

    /// Windows platform name
    pub fn name_win(self) -> &'static str {
        match self {
            Self::Bits32 => "win32",
            Self::Bits64 => "win64",
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Directory layout and toolchain naming for one bitness
#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
    /// Target bitness
    pub bitness: Bitness,
    /// Absolute working directory
    pub work_dir: PathBuf,
    /// Toolchain directory name inside the working directory
    pub toolchain_dir: String,
    /// Operating system part of the host triple
    pub target_os: String,
    /// Parallel jobs handed to build tools
    pub cpu_count: usize,
    /// CFLAGS every node starts from
    pub original_cflags: String,
    /// PATH inherited by the orchestrator
    pub original_path: String,
}

impl BuildContext {
    /// Create a context with defaults for everything but bitness and working directory
    pub fn new(bitness: Bitness, work_dir: PathBuf) -> Self {
        Self {
            bitness,
            work_dir,
            toolchain_dir: defaults::DEFAULT_TOOLCHAIN_DIR.to_string(),
            target_os: defaults::DEFAULT_TARGET_OS.to_string(),
            cpu_count: num_cpus::get(),
            original_cflags: defaults::DEFAULT_CFLAGS.to_string(),
            original_path: std::env::var("PATH").unwrap_or_default(),
        }
    }

    /// Set the number of parallel jobs
    #[must_use]
    pub fn with_cpu_count(mut self, cpu_count: usize) -> Self {
        self.cpu_count = cpu_count.max(1);
        self
    }

    /// Set the toolchain directory name
    #[must_use]
    pub fn with_toolchain_dir(mut self, dir: &str) -> Self {
        self.toolchain_dir = dir.to_string();
        self
    }

    /// Set the target operating system
    #[must_use]
    pub fn with_target_os(mut self, target_os: &str) -> Self {
        self.target_os = target_os.to_string();
        self
    }

    /// Set the starting CFLAGS
    #[must_use]
    pub fn with_cflags(mut self, cflags: &str) -> Self {
        self.original_cflags = cflags.to_string();
        self
    }

    /// Set the inherited PATH
    #[must_use]
    pub fn with_original_path(mut self, path: &str) -> Self {
        self.original_path = path.to_string();
        self
    }

    /// e.g. `x86_64-w64-mingw32`
    pub fn target_host(&self) -> String {
        format!("{}-{}", self.bitness.name(), self.target_os)
    }

    /// Toolchain root for this bitness
    pub fn target_sub_prefix(&self) -> PathBuf {
        self.work_dir
            .join(&self.toolchain_dir)
            .join(format!("{}-{}", self.bitness.name(), self.target_os))
    }

    /// Install prefix shared by all dependencies
    pub fn target_prefix(&self) -> PathBuf {
        self.target_sub_prefix().join(self.target_host())
    }

    /// Cross compiler binaries
    pub fn toolchain_bin(&self) -> PathBuf {
        self.target_sub_prefix().join("bin")
    }

    /// Binaries inside the target prefix
    pub fn toolchain_bin2(&self) -> PathBuf {
        self.target_prefix().join("bin")
    }

    /// Where dependency trees live
    pub fn in_tree_prefix(&self) -> PathBuf {
        self.work_dir.join(self.bitness.name())
    }

    /// Scratch space for out-of-tree builds
    pub fn offtree_prefix(&self) -> PathBuf {
        self.work_dir.join(format!("{}_offtree", self.bitness.name()))
    }

    /// Where product trees live
    pub fn product_prefix(&self) -> PathBuf {
        self.work_dir.join(format!("{}_products", self.bitness.name()))
    }

    pub fn pkg_config_path(&self) -> PathBuf {
        self.target_prefix().join("lib").join("pkgconfig")
    }

    pub fn meson_env_file(&self) -> PathBuf {
        self.target_sub_prefix().join(defaults::MESON_CROSS_FILE)
    }

    /// e.g. `x86_64-w64-mingw32-`
    pub fn cross_prefix_bare(&self) -> String {
        format!("{}-", self.target_host())
    }

    /// Bare prefix with the toolchain directory prepended
    pub fn cross_prefix_full(&self) -> String {
        format!(
            "{}/{}",
            self.toolchain_bin().display(),
            self.cross_prefix_bare()
        )
    }

    /// Variable assignments for plain Makefiles
    pub fn make_prefix_options(&self) -> String {
        let bare = self.cross_prefix_bare();
        format!(
            "CC={bare}gcc AR={bare}ar PREFIX={} RANLIB={bare}ranlib LD={bare}ld STRIP={bare}strip CXX={bare}g++",
            self.target_prefix().display()
        )
    }

    /// Toolchain definitions for CMake
    pub fn cmake_prefix_options(&self) -> String {
        let full = self.cross_prefix_full();
        format!(
            "-G\"Unix Makefiles\" -DCMAKE_SYSTEM_PROCESSOR=\"{}\" -DENABLE_STATIC_RUNTIME=1 \
             -DCMAKE_SYSTEM_NAME=Windows -DCMAKE_RANLIB={full}ranlib -DCMAKE_C_COMPILER={full}gcc \
             -DCMAKE_CXX_COMPILER={full}g++ -DCMAKE_RC_COMPILER={full}windres \
             -DCMAKE_FIND_ROOT_PATH={}",
            self.bitness.name(),
            self.target_prefix().display()
        )
    }

    /// Parent directory of a node's working tree
    pub fn node_root(&self, kind: NodeKind) -> PathBuf {
        match kind {
            NodeKind::Dependency => self.in_tree_prefix(),
            NodeKind::Product => self.product_prefix(),
        }
    }

    /// Working tree of a node
    pub fn node_dir(&self, node: &Node) -> PathBuf {
        self.node_root(node.id.kind).join(node.dir_name())
    }

    /// Create the per-bitness directories
    pub fn init_dirs(&self) -> Result<(), FilesystemError> {
        for dir in [
            self.in_tree_prefix(),
            self.product_prefix(),
            self.offtree_prefix(),
        ] {
            if !dir.is_dir() {
                info!("Creating bitness directory: {}", dir.display());
                filesystem::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Warn when the cross compiler is not where the context expects it
    pub fn check_toolchain(&self) -> bool {
        let gcc = format!("{}gcc", self.cross_prefix_bare());
        let found = which::which_in(&gcc, Some(self.toolchain_bin()), &self.work_dir).is_ok();
        if !found {
            warn!(
                "Cross compiler '{gcc}' not found in '{}'; builds relying on it will fail",
                self.toolchain_bin().display()
            );
        }
        found
    }

    /// Environment every node starts from
    pub fn base_env(&self) -> EnvOverlay {
        let mut env = EnvOverlay::new();
        env.insert("PATH".to_string(), self.toolchain_path());
        env.insert(
            "PKG_CONFIG_PATH".to_string(),
            self.pkg_config_path().display().to_string(),
        );
        env.insert("PKG_CONFIG_LIBDIR".to_string(), String::new());
        env.insert("CFLAGS".to_string(), self.original_cflags.clone());
        env.insert("LDFLAGS".to_string(), self.original_cflags.clone());
        env
    }

    fn toolchain_path(&self) -> String {
        join_path(&[
            self.toolchain_bin().display().to_string(),
            self.original_path.clone(),
        ])
    }

    /// Environment overlay for one node's invocations
    ///
    /// Applied in order: CFLAGS append, CFLAGS/LDFLAGS replacement, PATH
    /// replacement, PATH flip, explicit variables.
    pub fn node_env(&self, node: &Node, cwd: &Path) -> EnvOverlay {
        let mut env = self.base_env();
        let recipe = &node.env;

        if let Some(append) = &recipe.cflags_append {
            let extra = append.render(&self.scope(&env, cwd));
            let cflags = env.entry("CFLAGS".to_string()).or_default();
            cflags.push(' ');
            cflags.push_str(extra.trim());
        }
        if let Some(cflags) = &recipe.cflags {
            let value = cflags.render(&self.scope(&env, cwd));
            env.insert("CFLAGS".to_string(), value.clone());
            env.insert("LDFLAGS".to_string(), value);
        }
        if let Some(path) = &recipe.path {
            let value = path.render(&self.scope(&env, cwd));
            env.insert("PATH".to_string(), value);
        }
        if recipe.flip_path {
            env.insert(
                "PATH".to_string(),
                join_path(&[
                    self.toolchain_bin().display().to_string(),
                    self.toolchain_bin2().display().to_string(),
                    self.original_path.clone(),
                ]),
            );
        }
        for (key, value) in &recipe.vars {
            let rendered = value.render(&self.scope(&env, cwd));
            env.insert(key.clone(), rendered);
        }
        env
    }

    /// Field source bound to an overlay and working directory
    pub fn scope<'a>(&'a self, env: &'a EnvOverlay, cwd: &'a Path) -> Scope<'a> {
        Scope {
            ctx: self,
            env,
            cwd,
        }
    }

    /// Write the meson cross file unless it already exists
    pub fn write_meson_cross_file(&self) -> Result<(), FilesystemError> {
        let path = self.meson_env_file();
        if path.is_file() {
            return Ok(());
        }
        info!("Creating meson cross file at '{}'", path.display());
        filesystem::write_file(&path, &self.meson_cross_file())
    }

    fn meson_cross_file(&self) -> String {
        let full = self.cross_prefix_full();
        let cpu = self.bitness.name();
        let machine = format!(
            "system = 'windows'\ncpu_family = '{cpu}'\ncpu = '{cpu}'\nendian = 'little'\n"
        );
        let mut out = String::from("[binaries]\n");
        for (key, tool) in [
            ("c", "gcc"),
            ("cpp", "g++"),
            ("ld", "ld"),
            ("ar", "ar"),
            ("strip", "strip"),
            ("windres", "windres"),
            ("ranlib", "ranlib"),
            ("pkgconfig", "pkg-config"),
            ("dlltool", "dlltool"),
        ] {
            out.push_str(&format!("{key} = '{full}{tool}'\n"));
        }
        out.push_str(&format!(
            "gendef = '{}/gendef'\nneeds_exe_wrapper = false\n\n",
            self.toolchain_bin().display()
        ));
        out.push_str("[host_machine]\n");
        out.push_str(&machine);
        out.push_str("\n[target_machine]\n");
        out.push_str(&machine);
        out.push_str(&format!(
            "\n[properties]\nc_link_args = ['-static', '-static-libgcc']\nsys_root = '{}'\n",
            self.target_sub_prefix().display()
        ));
        out
    }
}

fn join_path(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(":")
}

/// Template values as seen from one node's invocation
pub struct Scope<'a> {
    ctx: &'a BuildContext,
    env: &'a EnvOverlay,
    cwd: &'a Path,
}

impl FieldSource for Scope<'_> {
    fn field(&self, field: Field) -> String {
        let ctx = self.ctx;
        let path = |p: PathBuf| p.display().to_string();
        match field {
            Field::CmakePrefixOptions => ctx.cmake_prefix_options(),
            Field::MakePrefixOptions => ctx.make_prefix_options(),
            Field::PkgConfigPath => path(ctx.pkg_config_path()),
            Field::ToolchainBin => path(ctx.toolchain_bin()),
            Field::ToolchainBin2 => path(ctx.toolchain_bin2()),
            Field::CrossPrefixBare => ctx.cross_prefix_bare(),
            Field::CrossPrefixFull => ctx.cross_prefix_full(),
            Field::TargetPrefix => path(ctx.target_prefix()),
            Field::InTreePrefix => path(ctx.in_tree_prefix()),
            Field::OfftreePrefix => path(ctx.offtree_prefix()),
            Field::TargetHost => ctx.target_host(),
            Field::TargetSubPrefix => path(ctx.target_sub_prefix()),
            Field::BitName => ctx.bitness.name().to_string(),
            Field::BitName2 => ctx.bitness.name2().to_string(),
            Field::BitName3 => ctx.bitness.name3().to_string(),
            Field::BitNameWin => ctx.bitness.name_win().to_string(),
            Field::BitNum => ctx.bitness.bits().to_string(),
            Field::ProductPrefix => path(ctx.product_prefix()),
            Field::TargetPrefixSedEscaped => path(ctx.target_prefix()).replace('/', "\\/"),
            Field::MakeCpuCount => format!("-j {}", ctx.cpu_count),
            Field::CpuCount => ctx.cpu_count.to_string(),
            Field::OriginalCflags => ctx.original_cflags.clone(),
            Field::CflagString => self
                .env
                .get("CFLAGS")
                .map(String::as_str)
                .unwrap_or(&ctx.original_cflags)
                .split_whitespace()
                .map(|flag| format!("--extra-cflags={flag}"))
                .collect::<Vec<_>>()
                .join(" "),
            Field::CurrentPath => self.cwd.display().to_string(),
            Field::CurrentEnvPath => self
                .env
                .get("PATH")
                .cloned()
                .unwrap_or_else(|| ctx.original_path.clone()),
            Field::MesonEnvFile => path(ctx.meson_env_file()),
        }
    }
}
