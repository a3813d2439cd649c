//! Stage completion markers
//!
//! A completed stage leaves an empty file `already_<stage>_<fingerprint>` in
//! the node's source directory. The fingerprint hashes the node name with the
//! stage's rendered options, so changing the options orphans the old marker.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use walkdir::WalkDir;

use crate::config::defaults::{FINGERPRINT_LEN, MARKER_PREFIX};
use crate::error::FilesystemError;
use crate::infra::filesystem;
use crate::infra::hash::{digest_bytes, HashAlgorithm};

/// Pipeline stages that leave a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configure,
    Build,
    Install,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Configure, Stage::Build, Stage::Install];

    /// Name used in marker files
    pub fn marker_name(self) -> &'static str {
        match self {
            Self::Configure => "configured",
            Self::Build => "ran_make",
            Self::Install => "ran_install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Install => "install",
        })
    }
}

/// Stable short hash of a node name and its effective stage options
pub fn fingerprint(node: &str, options: &str) -> String {
    let mut digest = digest_bytes(HashAlgorithm::Sha256, format!("{node}{options}").as_bytes());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

/// Marker bookkeeping for one node directory
#[derive(Debug, Clone)]
pub struct StageTracker {
    dir: PathBuf,
}

impl StageTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn stage_prefix(stage: Stage) -> String {
        format!("{MARKER_PREFIX}{}_", stage.marker_name())
    }

    fn marker_path(&self, stage: Stage, fingerprint: &str) -> PathBuf {
        self.dir
            .join(format!("{}{fingerprint}", Self::stage_prefix(stage)))
    }

    /// Whether the marker for exactly this fingerprint exists
    pub fn is_complete(&self, stage: Stage, fingerprint: &str) -> bool {
        self.marker_path(stage, fingerprint).is_file()
    }

    /// Whether any marker of this stage exists, whatever its fingerprint
    pub fn any_complete(&self, stage: Stage) -> bool {
        !self.markers(Some(stage)).is_empty()
    }

    /// Record a stage as done
    pub fn mark_complete(&self, stage: Stage, fingerprint: &str) -> Result<(), FilesystemError> {
        let path = self.marker_path(stage, fingerprint);
        debug!(marker = %path.display(), "Marking {stage} complete");
        filesystem::touch(&path)
    }

    /// Drop every marker of one stage
    pub fn invalidate(&self, stage: Stage) -> Result<(), FilesystemError> {
        for marker in self.markers(Some(stage)) {
            debug!(marker = %marker.display(), "Removing stage marker");
            filesystem::remove_file(&marker)?;
        }
        Ok(())
    }

    /// Drop every marker in the directory
    pub fn invalidate_all(&self) -> Result<(), FilesystemError> {
        for marker in self.markers(None) {
            debug!(marker = %marker.display(), "Removing stage marker");
            filesystem::remove_file(&marker)?;
        }
        Ok(())
    }

    fn markers(&self, stage: Option<Stage>) -> Vec<PathBuf> {
        let prefix = match stage {
            Some(stage) => Self::stage_prefix(stage),
            None => MARKER_PREFIX.to_string(),
        };
        if !self.dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .map(|e| e.into_path())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_mark_then_complete() {
        let temp = TempDir::new().unwrap();
        let tracker = StageTracker::new(temp.path());
        let fp = fingerprint("zlib", "--prefix=/p");

        assert!(!tracker.is_complete(Stage::Configure, &fp));
        tracker.mark_complete(Stage::Configure, &fp).unwrap();
        assert!(tracker.is_complete(Stage::Configure, &fp));
        assert!(!tracker.is_complete(Stage::Build, &fp));
        assert!(temp
            .path()
            .join(format!("already_configured_{fp}"))
            .is_file());
    }

    #[test]
    fn test_changed_options_change_fingerprint() {
        let temp = TempDir::new().unwrap();
        let tracker = StageTracker::new(temp.path());
        let old = fingerprint("zlib", "--enable-a");
        let new = fingerprint("zlib", "--enable-b");

        tracker.mark_complete(Stage::Configure, &old).unwrap();
        assert_ne!(old, new);
        assert!(!tracker.is_complete(Stage::Configure, &new));
        assert!(tracker.any_complete(Stage::Configure));
    }

    #[test]
    fn test_invalidate_one_stage() {
        let temp = TempDir::new().unwrap();
        let tracker = StageTracker::new(temp.path());
        let fp = fingerprint("x", "");
        for stage in Stage::ALL {
            tracker.mark_complete(stage, &fp).unwrap();
        }

        tracker.invalidate(Stage::Build).unwrap();
        assert!(tracker.is_complete(Stage::Configure, &fp));
        assert!(!tracker.is_complete(Stage::Build, &fp));
        assert!(tracker.is_complete(Stage::Install, &fp));
    }

    #[test]
    fn test_invalidate_all_keeps_other_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Makefile"), "all:").unwrap();
        let tracker = StageTracker::new(temp.path());
        for stage in Stage::ALL {
            tracker.mark_complete(stage, "abc").unwrap();
        }

        tracker.invalidate_all().unwrap();
        for stage in Stage::ALL {
            assert!(!tracker.any_complete(stage));
        }
        assert!(temp.path().join("Makefile").is_file());
    }

    #[test]
    fn test_missing_directory_has_no_markers() {
        let tracker = StageTracker::new("/nonexistent/crossforge/node");
        assert!(!tracker.any_complete(Stage::Install));
        tracker.invalidate_all().unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Fingerprints are deterministic, hex and fixed length
        #[test]
        fn prop_fingerprint_stable(node in "[a-z0-9_]{1,20}", options in ".{0,60}") {
            let a = fingerprint(&node, &options);
            prop_assert_eq!(&a, &fingerprint(&node, &options));
            prop_assert_eq!(a.len(), FINGERPRINT_LEN);
            prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
