//! Error types for crossforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::hash::HashAlgorithm;

/// Template compilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Placeholder does not name a known build context field
    #[error("Unknown placeholder '{{{name}}}'")]
    UnknownField { name: String },

    /// `{var:NAME}` references an undeclared catalog variable
    #[error("Unknown catalog variable '{name}'")]
    UnknownVariable { name: String },

    /// A catalog variable tried to splice another variable
    #[error("Catalog variable '{name}' cannot be used inside another variable")]
    NestedVariable { name: String },

    /// Brace without a partner
    #[error("Unbalanced '{brace}' at offset {offset}")]
    Unbalanced { brace: char, offset: usize },
}

/// Catalog loading and validation errors
///
/// Everything here is detected before any external process runs.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read catalog file
    #[error("Failed to read catalog '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Failed to parse catalog file
    #[error("Failed to parse catalog: {0}")]
    ParseError(String),

    /// Requested node does not exist
    #[error("Unknown {kind} '{name}'")]
    UnknownNode { kind: &'static str, name: String },

    /// Missing dependency
    #[error("Missing dependency: '{dependency}' required by '{node}'")]
    MissingDependency { node: String, dependency: String },

    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Archive source without download locations
    #[error("Node '{node}' declares an archive source with no download locations")]
    EmptyLocations { node: String },

    /// Recipe is structurally invalid
    #[error("Node '{node}' is malformed: {message}")]
    InvalidRecipe { node: String, message: String },

    /// Template in a recipe failed to compile
    #[error("Node '{node}' has an invalid template in '{key}': {source}")]
    InvalidTemplate {
        node: String,
        key: String,
        #[source]
        source: TemplateError,
    },

    /// Template in the variables table failed to compile
    #[error("Catalog variable '{name}' is invalid: {source}")]
    InvalidVariable {
        name: String,
        #[source]
        source: TemplateError,
    },
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Process could not be started
    #[error("Failed to start '{command}' in '{}': {error}", cwd.display())]
    Spawn {
        command: String,
        cwd: PathBuf,
        error: String,
    },

    /// Process exited unsuccessfully
    #[error("Command '{command}' failed with {} in '{}'", exit_label(*code), cwd.display())]
    Failed {
        command: String,
        cwd: PathBuf,
        code: Option<i32>,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// URL scheme that no fetcher handles
    #[error("Unsupported URL scheme: '{url}'")]
    UnsupportedScheme { url: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove a file or directory
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to rename
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Source acquisition errors
#[derive(Error, Debug)]
pub enum AcquireError {
    /// Download failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Downloaded file does not match any declared digest
    #[error(
        "Hash mismatch for '{}': {algorithm} is {actual}, expected one of [{}]",
        file.display(),
        expected.join(", ")
    )]
    HashMismatch {
        file: PathBuf,
        algorithm: HashAlgorithm,
        expected: Vec<String>,
        actual: String,
    },

    /// Archive extraction failed
    #[error("Failed to unpack '{}': {source}", archive.display())]
    Unpack {
        archive: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Version control command failed
    #[error("Version control operation failed: {0}")]
    Vcs(#[source] ProcessError),

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Patch errors
#[derive(Error, Debug)]
pub enum PatchError {
    /// Patch file could not be fetched
    #[error("Failed to fetch patch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// Pre-configure patch did not apply
    #[error("Patch '{url}' did not apply: {source}")]
    ApplyFailed {
        url: String,
        #[source]
        source: ProcessError,
    },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Build pipeline errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// A stage command failed
    #[error("{stage} failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: ProcessError,
    },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Top-level crossforge error type
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Acquisition error
    #[error("Acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    /// Patch error
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Process error outside of a stage (hooks, header downloads)
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Download error outside of acquisition
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// A node failed; carries the directory the user may delete to recover
    #[error(
        "Failed to build '{node}': {source}\nDelete '{}' and run again to rebuild it from scratch",
        dir.display()
    )]
    Node {
        node: String,
        dir: PathBuf,
        #[source]
        source: Box<ForgeError>,
    },
}

impl ForgeError {
    /// Attach the failing node and its working directory
    pub fn in_node(self, node: &str, dir: PathBuf) -> Self {
        match self {
            Self::Node { .. } | Self::Catalog(_) => self,
            other => Self::Node {
                node: node.to_string(),
                dir,
                source: Box::new(other),
            },
        }
    }
}
