//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Settings used by every test project: one bitness, a local work directory
pub const TEST_SETTINGS: &str = r#"
[script]
product_order = []

[toolchain]
bitness = [64]
cpu_count = 2
work_dir = "work"
"#;

/// Test project context
///
/// A temporary directory holding `crossforge.toml` and `catalog.toml`,
/// with helpers to run the binary inside it.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a project with the test settings and the given catalog
    pub fn new(catalog: &str) -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        project.create_file("crossforge.toml", TEST_SETTINGS);
        project.create_file("catalog.toml", catalog);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Working tree of a 64-bit dependency
    pub fn dependency_dir(&self, folder: &str) -> PathBuf {
        self.path().join("work").join("x86_64").join(folder)
    }

    /// Working tree of a 64-bit product
    pub fn product_dir(&self, folder: &str) -> PathBuf {
        self.path().join("work").join("x86_64_products").join(folder)
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run crossforge with `args` inside the project
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_crossforge"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute crossforge")
    }
}

/// Stdout of a finished command
#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
