//! Version control command sequences
//!
//! Drives the git, hg and svn command line clients through a
//! [`CommandRunner`]. Fresh checkouts land in `<folder>.tmp` and are renamed
//! into place only once complete, so an interrupted clone never looks done.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::catalog::GitSource;
use crate::core::vcs::Divergence;
use crate::error::{AcquireError, ProcessError};
use crate::infra::filesystem;
use crate::infra::process::{run_checked, CommandRunner, Invocation};

/// What happened to a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStatus {
    /// Fresh clone
    Cloned,
    /// Existing checkout left as it was
    Unchanged,
    /// Existing checkout moved to new upstream code
    Updated,
}

struct Vcs<'a> {
    runner: &'a dyn CommandRunner,
}

impl Vcs<'_> {
    fn run(&self, command: &str, cwd: &Path) -> Result<(), AcquireError> {
        run_checked(self.runner, &Invocation::new(command, cwd))
            .map(drop)
            .map_err(AcquireError::Vcs)
    }

    fn query(&self, command: &str, cwd: &Path) -> Result<String, AcquireError> {
        run_checked(self.runner, &Invocation::new(command, cwd).silent())
            .map(|out| out.output.trim().to_string())
            .map_err(AcquireError::Vcs)
    }

    /// Clear a leftover partial clone, run `clone` into it, then move it into place
    fn fresh_clone(
        &self,
        parent: &Path,
        folder: &str,
        clone: impl FnOnce(&Path) -> Result<(), AcquireError>,
    ) -> Result<CheckoutStatus, AcquireError> {
        let tmp = parent.join(format!("{folder}.tmp"));
        if tmp.exists() {
            debug!("Removing incomplete checkout '{}'", tmp.display());
            filesystem::remove_dir_all(&tmp)?;
        }
        clone(&tmp)?;
        filesystem::rename(&tmp, &parent.join(folder))?;
        Ok(CheckoutStatus::Cloned)
    }
}

/// Clone or update a git checkout at `<parent>/<folder>`
pub fn sync_git(
    runner: &dyn CommandRunner,
    parent: &Path,
    folder: &str,
    git: &GitSource,
) -> Result<CheckoutStatus, AcquireError> {
    let vcs = Vcs { runner };
    let dir = parent.join(folder);

    if !dir.is_dir() {
        info!("Cloning '{}' into '{}'", git.url, dir.display());
        return vcs.fresh_clone(parent, folder, |tmp| {
            let recursive = if git.recursive { " --recursive" } else { "" };
            vcs.run(
                &format!(
                    "git clone{recursive} --progress \"{}\" \"{}\"",
                    git.url,
                    tmp.display()
                ),
                parent,
            )?;
            if let Some(branch) = &git.branch {
                vcs.run(&format!("git checkout {branch}"), tmp)?;
            }
            if let Some(pr) = git.pull_request {
                info!("Fetching pull request #{pr}");
                vcs.run(&format!("git fetch origin refs/pull/{pr}/head"), tmp)?;
                vcs.run("git checkout FETCH_HEAD", tmp)?;
            }
            Ok(())
        });
    }

    if let Some(pr) = git.pull_request {
        info!(
            "'{}' is pinned to pull request #{pr} and is not updated; delete it to refresh",
            dir.display()
        );
        return Ok(CheckoutStatus::Unchanged);
    }
    if git.no_update {
        info!("'{}' is marked no_update, leaving it as is", dir.display());
        return Ok(CheckoutStatus::Unchanged);
    }

    vcs.run("git remote update", &dir)?;
    let upstream = git.branch.as_deref().unwrap_or("@{u}");
    let local = vcs.query("git rev-parse @", &dir)?;
    let remote = vcs.query(&format!("git rev-parse \"{upstream}\""), &dir)?;
    let base = vcs.query(&format!("git merge-base @ \"{upstream}\""), &dir)?;

    vcs.run("git checkout -f", &dir)?;
    if let Some(branch) = &git.branch {
        vcs.run(&format!("git checkout {branch}"), &dir)?;
    }

    let state = Divergence::classify(&local, &remote, &base);
    debug!(%local, %remote, %base, "Checkout '{}' is {state}", dir.display());
    match state {
        Divergence::UpToDate => Ok(CheckoutStatus::Unchanged),
        Divergence::NeedsPull => {
            info!("Updating '{}'", dir.display());
            match &git.branch {
                Some(branch) => vcs.run(&format!("git pull origin {branch}"), &dir)?,
                None => vcs.run("git pull", &dir)?,
            }
            git_clean_tree(runner, &dir).map_err(AcquireError::Vcs)?;
            vcs.run("git submodule update --init --recursive", &dir)?;
            Ok(CheckoutStatus::Updated)
        }
        Divergence::NeedsPush | Divergence::Diverged => {
            warn!(
                "Checkout '{}' is {state}; building what is on disk",
                dir.display()
            );
            Ok(CheckoutStatus::Unchanged)
        }
    }
}

/// Remove untracked files and local changes, submodules included
pub fn git_clean_tree(runner: &dyn CommandRunner, dir: &Path) -> Result<(), ProcessError> {
    for command in [
        "git clean -xfdf",
        "git submodule foreach --recursive git clean -xfdf",
        "git reset --hard",
        "git submodule foreach --recursive git reset --hard",
    ] {
        run_checked(runner, &Invocation::new(command, dir))?;
    }
    Ok(())
}

/// Clone or update a mercurial checkout at `<parent>/<folder>`
pub fn sync_hg(
    runner: &dyn CommandRunner,
    parent: &Path,
    folder: &str,
    url: &str,
    branch: Option<&str>,
) -> Result<CheckoutStatus, AcquireError> {
    let vcs = Vcs { runner };
    let dir = parent.join(folder);

    if !dir.is_dir() {
        info!("Cloning '{url}' into '{}'", dir.display());
        return vcs.fresh_clone(parent, folder, |tmp| {
            vcs.run(&format!("hg clone {url} \"{}\"", tmp.display()), parent)?;
            if let Some(branch) = branch {
                vcs.run(&format!("hg up {branch} -v"), tmp)?;
            }
            Ok(())
        });
    }

    let before = vcs.query("hg --debug id -i", &dir)?;
    vcs.run("hg pull -u", &dir)?;
    vcs.run(&format!("hg update -C {}", branch.unwrap_or("default")), &dir)?;
    let after = vcs.query("hg --debug id -i", &dir)?;

    if before == after {
        debug!("'{}' already up to date", dir.display());
        Ok(CheckoutStatus::Unchanged)
    } else {
        info!("'{}' has upstream changes", dir.display());
        Ok(CheckoutStatus::Updated)
    }
}

/// Check out a subversion tree at `<parent>/<folder>`; existing trees are left alone
pub fn sync_svn(
    runner: &dyn CommandRunner,
    parent: &Path,
    folder: &str,
    url: &str,
    revision: Option<&str>,
) -> Result<CheckoutStatus, AcquireError> {
    let vcs = Vcs { runner };
    if parent.join(folder).is_dir() {
        return Ok(CheckoutStatus::Unchanged);
    }

    info!("Checking out '{url}' into '{folder}'");
    vcs.fresh_clone(parent, folder, |tmp| {
        let revision = revision
            .map(|r| format!("-r \"{r}\" "))
            .unwrap_or_default();
        vcs.run(
            &format!(
                "svn co {revision}\"{url}\" \"{}\" --non-interactive --trust-server-cert",
                tmp.display()
            ),
            parent,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingRunner;
    use tempfile::TempDir;

    fn git(url: &str) -> GitSource {
        GitSource {
            url: url.to_string(),
            branch: None,
            recursive: false,
            no_update: false,
            pull_request: None,
        }
    }

    // ============================================
    // Unit Tests - git
    // ============================================

    #[test]
    fn test_git_clone_goes_through_tmp() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new().on("git clone", |inv| {
            let tmp = inv.command.split('"').find(|p| p.ends_with(".tmp")).unwrap().to_string();
            std::fs::create_dir_all(tmp).unwrap();
        });

        let status = sync_git(&runner, temp.path(), "mpv_git", &git("https://e.com/mpv.git")).unwrap();

        assert_eq!(status, CheckoutStatus::Cloned);
        assert!(temp.path().join("mpv_git").is_dir());
        assert!(!temp.path().join("mpv_git.tmp").exists());
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("mpv_git.tmp"));
    }

    #[test]
    fn test_git_clone_failure_leaves_no_checkout() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new().fail_on("git clone");

        let err = sync_git(&runner, temp.path(), "x_git", &git("https://e.com/x.git")).unwrap_err();
        assert!(matches!(err, AcquireError::Vcs(_)));
        assert!(!temp.path().join("x_git").exists());
    }

    #[test]
    fn test_git_behind_upstream_pulls_and_cleans() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("x_git")).unwrap();
        let runner = RecordingRunner::new()
            .respond("git rev-parse @", "aaa\n")
            .respond("git rev-parse \"@{u}\"", "bbb\n")
            .respond("git merge-base", "aaa\n");

        let status = sync_git(&runner, temp.path(), "x_git", &git("https://e.com/x.git")).unwrap();

        assert_eq!(status, CheckoutStatus::Updated);
        let commands = runner.commands();
        assert!(commands.contains(&"git pull".to_string()));
        assert!(commands.contains(&"git clean -xfdf".to_string()));
        assert!(commands.contains(&"git reset --hard".to_string()));
    }

    #[test]
    fn test_git_diverged_only_warns() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("x_git")).unwrap();
        let runner = RecordingRunner::new()
            .respond("git rev-parse @", "aaa")
            .respond("git rev-parse \"@{u}\"", "bbb")
            .respond("git merge-base", "ccc");

        let status = sync_git(&runner, temp.path(), "x_git", &git("https://e.com/x.git")).unwrap();

        assert_eq!(status, CheckoutStatus::Unchanged);
        let commands = runner.commands();
        assert!(!commands.iter().any(|c| c.starts_with("git pull")));
        assert!(!commands.iter().any(|c| c.contains("reset --hard")));
    }

    #[test]
    fn test_git_pinned_pr_never_updates() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("x_git")).unwrap();
        let runner = RecordingRunner::new();
        let source = GitSource {
            pull_request: Some(42),
            ..git("https://e.com/x.git")
        };

        let status = sync_git(&runner, temp.path(), "x_git", &source).unwrap();
        assert_eq!(status, CheckoutStatus::Unchanged);
        assert!(runner.commands().is_empty());
    }

    // ============================================
    // Unit Tests - hg / svn
    // ============================================

    #[test]
    fn test_hg_update_detects_change() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("x265_hg")).unwrap();
        let runner = RecordingRunner::new().respond_seq("hg --debug id -i", &["111", "222"]);

        let status = sync_hg(&runner, temp.path(), "x265_hg", "https://e.com/x265", None).unwrap();
        assert_eq!(status, CheckoutStatus::Updated);
        assert!(runner
            .commands()
            .contains(&"hg update -C default".to_string()));
    }

    #[test]
    fn test_svn_existing_tree_untouched() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("xavs_svn")).unwrap();
        let runner = RecordingRunner::new();

        let status = sync_svn(&runner, temp.path(), "xavs_svn", "https://e.com/svn", None).unwrap();
        assert_eq!(status, CheckoutStatus::Unchanged);
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_svn_revision_pinned() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new().on("svn co", |inv| {
            let tmp = inv.command.split('"').find(|p| p.ends_with(".tmp")).unwrap().to_string();
            std::fs::create_dir_all(tmp).unwrap();
        });

        sync_svn(&runner, temp.path(), "xavs_svn", "https://e.com/svn", Some("55")).unwrap();
        assert!(runner.commands()[0].starts_with("svn co -r \"55\" \"https://e.com/svn\""));
        assert!(temp.path().join("xavs_svn").is_dir());
    }
}
