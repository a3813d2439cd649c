//! Checkout freshness model

use std::fmt;

/// Where a local checkout stands relative to its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Local and remote point at the same revision
    UpToDate,
    /// Local is an ancestor of remote
    NeedsPull,
    /// Remote is an ancestor of local
    NeedsPush,
    /// Neither contains the other
    Diverged,
}

impl Divergence {
    /// Three-way comparison over local, remote and merge-base revisions
    pub fn classify(local: &str, remote: &str, base: &str) -> Self {
        let (local, remote, base) = (local.trim(), remote.trim(), base.trim());
        if local == remote {
            Self::UpToDate
        } else if local == base {
            Self::NeedsPull
        } else if remote == base {
            Self::NeedsPush
        } else {
            Self::Diverged
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UpToDate => "up to date",
            Self::NeedsPull => "behind upstream",
            Self::NeedsPush => "ahead of upstream",
            Self::Diverged => "diverged from upstream",
        })
    }
}
