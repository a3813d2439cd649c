//! Recipe definitions as written in the catalog
//!
//! These are the raw serde shapes of `catalog.toml`. They are turned into
//! validated [`crate::core::catalog::Node`] values by the catalog loader;
//! nothing downstream consumes them directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::infra::hash::HashAlgorithm;

/// Whole catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    /// Reusable option fragments, referenced as `{var:NAME}`
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Dependency namespace
    #[serde(default)]
    pub dependencies: BTreeMap<String, NodeSpec>,

    /// Product namespace
    #[serde(default)]
    pub products: BTreeMap<String, NodeSpec>,
}

/// One node as declared in the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Where the source tree comes from
    #[serde(default)]
    pub source: SourceSpec,

    /// Directory name override
    pub folder_name: Option<String>,

    /// Directory the acquired tree is moved to
    pub rename_folder: Option<String>,

    /// Dependency names, built first in declaration order
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Aggregates dependencies without building anything itself
    #[serde(default)]
    pub inherit_only: bool,

    /// Never descend into `depends_on` when building this node
    #[serde(default)]
    pub skip_deps: bool,

    /// Configure system
    #[serde(default)]
    pub recipe: RecipeKind,

    /// Build tool, defaulted from the recipe kind
    pub build_tool: Option<BuildTool>,

    /// Options appended to the configure command
    #[serde(default)]
    pub configure_options: String,

    /// Replaces `./configure` for autotools recipes
    pub configure_command: Option<String>,

    /// Look for bootstrap scripts when no configure script exists
    #[serde(default = "default_true")]
    pub bootstrap: bool,

    /// Run a tolerant clean after configuring
    #[serde(default = "default_true")]
    pub clean_post_configure: bool,

    /// Run the configure stage
    #[serde(default = "default_true")]
    pub needs_configure: bool,

    /// Run the build stage
    #[serde(default = "default_true")]
    pub needs_build: bool,

    /// Run the install stage
    #[serde(default = "default_true")]
    pub needs_install: bool,

    /// Options passed to the build tool
    #[serde(default)]
    pub build_options: String,

    /// Replaces the build tool invocation entirely
    pub build_command: Option<String>,

    /// Do not pass `-j`
    #[serde(default)]
    pub serial_build: bool,

    /// Commands run instead of failing when the build invocation fails
    #[serde(default)]
    pub build_fallback: Vec<String>,

    /// Options passed to the install invocation
    #[serde(default)]
    pub install_options: String,

    /// Install target name
    pub install_target: Option<String>,

    /// Subfolder of the acquired tree that holds the actual sources
    pub source_subfolder: Option<String>,

    /// Subfolder in which build and install run
    pub build_subdir: Option<String>,

    /// Patches, applied in order
    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    /// Before patches, skipped once configured
    #[serde(default)]
    pub run_pre_patch: Vec<String>,

    /// After patches, skipped once built
    #[serde(default)]
    pub run_post_patch: Vec<String>,

    /// After a configure invocation
    #[serde(default)]
    pub run_post_configure: Vec<String>,

    /// After a build invocation
    #[serde(default)]
    pub run_post_build: Vec<String>,

    /// After an install invocation
    #[serde(default)]
    pub run_post_install: Vec<String>,

    /// Extra environment for every invocation of this node
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Appended to CFLAGS
    pub cflags_append: Option<String>,

    /// Replaces CFLAGS and LDFLAGS
    pub cflags: Option<String>,

    /// Replaces PATH
    pub path: Option<String>,

    /// Put the target prefix bin directory on PATH after the toolchain
    #[serde(default)]
    pub flip_path: bool,

    /// Single header files fetched into the target include directory
    #[serde(default)]
    pub headers: Vec<String>,

    /// Printed before the node is built
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Descriptive metadata
    #[serde(default)]
    pub info: NodeInfo,
}

fn default_true() -> bool {
    true
}

/// Source retrieval strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    /// Archive downloaded from the first reachable mirror
    Archive { locations: Vec<LocationSpec> },

    /// Git checkout
    Git {
        url: String,
        branch: Option<String>,
        #[serde(default)]
        recursive: bool,
        /// Never update an existing checkout
        #[serde(default)]
        no_update: bool,
        /// Pin to a pull request head
        pull_request: Option<u32>,
    },

    /// Mercurial checkout
    Hg { url: String, branch: Option<String> },

    /// Subversion checkout
    Svn {
        url: String,
        revision: Option<String>,
    },

    /// Local folder, created if missing
    #[default]
    None,
}

/// One download mirror
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocationSpec {
    /// Archive URL
    pub url: String,

    /// Acceptable digests
    #[serde(default)]
    pub hashes: Vec<HashSpec>,
}

/// Declared digest of a download
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HashSpec {
    /// Digest algorithm
    #[serde(rename = "type")]
    pub algorithm: HashAlgorithm,

    /// Hex digest
    pub sum: String,
}

/// Configure system of a node
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    #[default]
    Autotools,
    Cmake,
    Meson,
    Waf,
    /// No configure step at all
    None,
}

impl RecipeKind {
    /// Build tool used when the recipe does not name one
    pub fn default_tool(self) -> BuildTool {
        match self {
            Self::Meson => BuildTool::Ninja,
            Self::Waf => BuildTool::Waf,
            Self::Autotools | Self::Cmake | Self::None => BuildTool::Make,
        }
    }
}

/// Tool driving the build and install stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    Make,
    Ninja,
    Waf,
    Rake,
}

impl BuildTool {
    /// Command prefix for build and install invocations
    pub fn command(self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Ninja => "ninja",
            Self::Waf => "./waf --color=yes",
            Self::Rake => "rake",
        }
    }
}

/// One patch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
    /// Patch location (`http(s)://`, `file://` or a path relative to the catalog)
    pub url: String,

    /// Leading path components stripped (`-pN`)
    #[serde(default = "default_strip")]
    pub strip: u32,

    /// Apply after configure, tolerating failure
    #[serde(default)]
    pub post_configure: bool,

    /// Subfolder of the source tree to apply in
    pub subdir: Option<String>,
}

fn default_strip() -> u32 {
    1
}

/// Descriptive metadata shown by `list`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeInfo {
    /// Upstream version
    pub version: Option<String>,

    /// Display name
    pub fancy_name: Option<String>,
}
