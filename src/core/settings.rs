//! Orchestrator settings
//!
//! Reads `crossforge.toml`. A missing file is written out with defaults so
//! users have something to edit, then loading continues with those defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::defaults;
use crate::core::context::{Bitness, BuildContext};
use crate::infra::filesystem;

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read settings file
    #[error("Failed to read settings file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse settings file
    #[error("Failed to parse settings file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// Failed to write default settings
    #[error("Failed to write default settings to '{path}': {error}")]
    WriteError { path: String, error: String },

    /// Bitness other than 32 or 64
    #[error("Unsupported bitness {0}, expected 32 or 64")]
    InvalidBitness(u32),
}

/// Complete settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub script: ScriptSettings,

    #[serde(default)]
    pub toolchain: ToolchainSettings,
}

/// Behavior of the orchestrator itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptSettings {
    /// Send external command output to the log file instead of the terminal
    pub quiet: bool,

    /// Log every invocation with its environment
    pub debug: bool,

    /// Products built by `build --all` or a bare `build`
    pub product_order: Vec<String>,

    /// Sent with probes and downloads
    pub user_agent: String,

    /// Receives external command output in quiet mode
    pub log_file: String,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            quiet: false,
            debug: false,
            product_order: defaults::DEFAULT_PRODUCT_ORDER
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            user_agent: defaults::DEFAULT_USER_AGENT.to_string(),
            log_file: defaults::DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Cross toolchain and directory layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Target widths, built in order
    pub bitness: Vec<u32>,

    /// Parallel jobs, host CPU count when absent
    pub cpu_count: Option<usize>,

    /// Toolchain directory inside the work directory
    pub toolchain_dir: String,

    /// Work directory, relative to the settings file
    pub work_dir: String,

    /// CFLAGS every node starts from
    pub original_cflags: String,

    /// Operating system part of the host triple
    pub target_os: String,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            bitness: vec![64],
            cpu_count: None,
            toolchain_dir: defaults::DEFAULT_TOOLCHAIN_DIR.to_string(),
            work_dir: defaults::DEFAULT_WORK_DIR.to_string(),
            original_cflags: defaults::DEFAULT_CFLAGS.to_string(),
            target_os: defaults::DEFAULT_TARGET_OS.to_string(),
        }
    }
}

impl Settings {
    /// Load settings, writing a default file first when none exists
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            info!(
                "Created default settings at '{}', edit it to suit your setup",
                path.display()
            );
            return Ok(settings);
        }
        Self::load(path)
    }

    /// Load settings from an existing file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| SettingsError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Write settings as TOML
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_error = |error: String| SettingsError::WriteError {
            path: path.display().to_string(),
            error,
        };
        let content = toml::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?;
        filesystem::write_file(path, &content).map_err(|e| write_error(e.to_string()))
    }

    /// Requested bitnesses, validated
    pub fn bitnesses(&self) -> Result<Vec<Bitness>, SettingsError> {
        self.toolchain
            .bitness
            .iter()
            .map(|&bits| Bitness::from_bits(bits).ok_or(SettingsError::InvalidBitness(bits)))
            .collect()
    }

    /// Work directory, resolved against `base`
    pub fn work_dir(&self, base: &Path) -> PathBuf {
        let dir = Path::new(&self.toolchain.work_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    }

    /// Build context for one bitness
    pub fn context(&self, bitness: Bitness, base: &Path) -> BuildContext {
        let toolchain = &self.toolchain;
        let mut ctx = BuildContext::new(bitness, self.work_dir(base))
            .with_toolchain_dir(&toolchain.toolchain_dir)
            .with_target_os(&toolchain.target_os)
            .with_cflags(&toolchain.original_cflags);
        if let Some(cpu_count) = toolchain.cpu_count {
            ctx = ctx.with_cpu_count(cpu_count);
        }
        ctx
    }

    /// Log file, resolved against the work directory
    pub fn log_file(&self, base: &Path) -> PathBuf {
        self.work_dir(base).join(&self.script.log_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_written_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(defaults::SETTINGS_FILE);

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.is_file());

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [toolchain]
            bitness = [32, 64]
            cpu_count = 2
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.bitnesses().unwrap(),
            vec![Bitness::Bits32, Bitness::Bits64]
        );
        assert_eq!(settings.toolchain.original_cflags, "-O3");
        assert!(!settings.script.quiet);
        assert_eq!(settings.script.product_order[0], "mpv");

        let ctx = settings.context(Bitness::Bits32, Path::new("/base"));
        assert_eq!(ctx.cpu_count, 2);
        assert_eq!(ctx.work_dir, PathBuf::from("/base/workdir"));
    }

    #[test]
    fn test_invalid_bitness_rejected() {
        let settings: Settings = toml::from_str("[toolchain]\nbitness = [16]").unwrap();
        assert!(matches!(
            settings.bitnesses(),
            Err(SettingsError::InvalidBitness(16))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("crossforge.toml");
        std::fs::write(&path, "[script]\nquiet = true\nloud = false\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::ParseError { .. })
        ));
    }

    #[test]
    fn test_absolute_work_dir_kept() {
        let settings: Settings = toml::from_str("[toolchain]\nwork_dir = \"/srv/build\"").unwrap();
        assert_eq!(
            settings.work_dir(Path::new("/home")),
            PathBuf::from("/srv/build")
        );
        assert_eq!(
            settings.log_file(Path::new("/home")),
            PathBuf::from("/srv/build/raw_build.log")
        );
    }
}
