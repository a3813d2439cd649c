//! Source acquisition
//!
//! Makes a node's source tree present under its parent directory: archives
//! are downloaded from the first reachable mirror, verified and unpacked,
//! checkouts are cloned or refreshed, local folders are created. Each
//! strategy leaves the tree at `<parent>/<dir_name>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::defaults::UNPACKED_SENTINEL;
use crate::core::catalog::{url_basename, Node, Source};
use crate::core::recipe::{HashSpec, LocationSpec};
use crate::error::{AcquireError, DownloadError};
use crate::infra::download::Fetcher;
use crate::infra::filesystem;
use crate::infra::hash::{digest_file, HashAlgorithm};
use crate::infra::process::{run_checked, CommandRunner, Invocation};
use crate::infra::vcs::{self, CheckoutStatus};

/// A source tree ready for patching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    /// Root of the tree
    pub dir: PathBuf,
    /// The checkout moved to new upstream code, so earlier stage results are stale
    pub updated: bool,
}

/// Fetches node sources through the process and download seams
pub struct SourceAcquirer<'a> {
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetcher,
}

impl<'a> SourceAcquirer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, fetcher: &'a dyn Fetcher) -> Self {
        Self { runner, fetcher }
    }

    /// Ensure the node's tree exists under `parent`
    pub fn acquire(&self, node: &Node, parent: &Path) -> Result<Acquired, AcquireError> {
        let folder = node.dir_name();
        let dir = parent.join(folder);

        let status = match &node.source {
            Source::Archive { locations } => self.unpack_archive(locations, parent, folder)?,
            Source::Git(git) => vcs::sync_git(self.runner, parent, folder, git)?,
            Source::Hg { url, branch } => {
                vcs::sync_hg(self.runner, parent, folder, url, branch.as_deref())?
            }
            Source::Svn { url, revision } => {
                vcs::sync_svn(self.runner, parent, folder, url, revision.as_deref())?
            }
            Source::None => {
                filesystem::create_dir_all(&dir)?;
                CheckoutStatus::Unchanged
            }
        };

        Ok(Acquired {
            dir,
            updated: status == CheckoutStatus::Updated,
        })
    }

    fn unpack_archive(
        &self,
        locations: &[LocationSpec],
        parent: &Path,
        folder: &str,
    ) -> Result<CheckoutStatus, AcquireError> {
        let dir = parent.join(folder);
        if dir.join(UNPACKED_SENTINEL).is_file() {
            debug!("'{}' already unpacked", dir.display());
            return Ok(CheckoutStatus::Unchanged);
        }

        let location = self.pick_mirror(locations)?;
        let file_name = url_basename(&location.url);
        let archive = parent.join(file_name);
        filesystem::create_dir_all(parent)?;

        info!("Downloading {file_name} ({})", location.url);
        self.fetcher.fetch(&location.url, &archive)?;

        if let Err(e) = verify_hashes(&archive, &location.hashes) {
            filesystem::remove_file(&archive)?;
            return Err(e);
        }

        info!("Unpacking {file_name}");
        self.extract(&archive, parent, folder)?;
        filesystem::touch(&dir.join(UNPACKED_SENTINEL))?;
        filesystem::remove_file(&archive)?;
        Ok(CheckoutStatus::Cloned)
    }

    /// First location answering a probe, else the first declared
    fn pick_mirror<'l>(&self, locations: &'l [LocationSpec]) -> Result<&'l LocationSpec, AcquireError> {
        let first = locations.first().ok_or_else(|| DownloadError::NetworkError {
            url: String::new(),
            error: "no download locations".to_string(),
        })?;
        Ok(locations
            .iter()
            .find(|loc| {
                let reachable = self.fetcher.probe(&loc.url);
                if !reachable {
                    debug!("Mirror '{}' is unreachable", loc.url);
                }
                reachable
            })
            .unwrap_or(first))
    }

    /// Unpack into `<folder>.tmp`, then move into place
    ///
    /// An archive holding a single top directory has that directory lifted;
    /// anything else becomes the tree as is.
    fn extract(&self, archive: &Path, parent: &Path, folder: &str) -> Result<(), AcquireError> {
        let dir = parent.join(folder);
        let tmp = parent.join(format!("{folder}.tmp"));
        filesystem::remove_dir_all(&tmp)?;
        filesystem::remove_dir_all(&dir)?;
        filesystem::create_dir_all(&tmp)?;

        let is_zip = archive
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        let command = if is_zip {
            format!("unzip -q -o \"{}\" -d \"{}\"", archive.display(), tmp.display())
        } else {
            format!("tar -xf \"{}\" -C \"{}\"", archive.display(), tmp.display())
        };

        run_checked(self.runner, &Invocation::new(command, parent)).map_err(|source| {
            AcquireError::Unpack {
                archive: archive.to_path_buf(),
                source,
            }
        })?;

        match single_subdir(&tmp) {
            Some(inner) => {
                filesystem::rename(&inner, &dir)?;
                filesystem::remove_dir_all(&tmp)?;
            }
            None => filesystem::rename(&tmp, &dir)?,
        }
        Ok(())
    }

    /// Download single header files into `include_dir`, skipping present ones
    pub fn fetch_headers(&self, urls: &[String], include_dir: &Path) -> Result<(), AcquireError> {
        for url in urls {
            let dest = include_dir.join(url_basename(url));
            if dest.is_file() {
                debug!("Header '{}' already present", dest.display());
                continue;
            }
            filesystem::create_dir_all(include_dir)?;
            info!("Fetching header {url}");
            self.fetcher.fetch(url, &dest)?;
        }
        Ok(())
    }
}

fn single_subdir(dir: &Path) -> Option<PathBuf> {
    let mut entries = std::fs::read_dir(dir).ok()?.filter_map(Result::ok);
    let first = entries.next()?;
    if entries.next().is_some() || !first.path().is_dir() {
        return None;
    }
    Some(first.path())
}

/// Check a download against its declared digests
///
/// Digests are grouped by algorithm. The file passes when, for every
/// algorithm declared, it matches at least one digest of that algorithm.
pub fn verify_hashes(file: &Path, hashes: &[HashSpec]) -> Result<(), AcquireError> {
    let mut groups: BTreeMap<HashAlgorithm, Vec<String>> = BTreeMap::new();
    for hash in hashes {
        groups
            .entry(hash.algorithm)
            .or_default()
            .push(hash.sum.to_ascii_lowercase());
    }

    for (algorithm, expected) in groups {
        let actual = digest_file(algorithm, file)?;
        if !expected.contains(&actual) {
            return Err(AcquireError::HashMismatch {
                file: file.to_path_buf(),
                algorithm,
                expected,
                actual,
            });
        }
        info!(
            "{algorithm} matched: {}...{}",
            &actual[..5],
            &actual[actual.len() - 5..]
        );
    }
    Ok(())
}
