//! Release sources.

use std::fmt;

use async_trait::async_trait;
use den_core::VersionRecord;

use crate::error::{EnrichmentError, Result};

/// A repository on the release host, `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Derive the repository from a package homepage.
    ///
    /// Accepts `https://github.com/<owner>/<repo>[/...]` with an optional
    /// `.git` suffix and trailing slash.
    pub fn from_homepage(homepage: &str) -> Result<Self> {
        let unsupported = || EnrichmentError::UnsupportedHost {
            homepage: homepage.to_string(),
        };

        let rest = homepage
            .strip_prefix("https://")
            .or_else(|| homepage.strip_prefix("http://"))
            .ok_or_else(unsupported)?;
        let rest = rest.strip_prefix("www.").unwrap_or(rest);
        let path = rest.strip_prefix("github.com/").ok_or_else(unsupported)?;

        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let owner = parts.next().ok_or_else(unsupported)?;
        let repo = parts.next().ok_or_else(unsupported)?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if repo.is_empty() {
            return Err(unsupported());
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A published release as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRelease {
    pub record: VersionRecord,
    /// Host's own pre-release marker.
    pub prerelease: bool,
}

/// Something that can list a repository's releases.
///
/// Implementations return published releases newest first.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// List published releases of `repo`.
    async fn releases(&self, repo: &RepoRef) -> Result<Vec<PublishedRelease>>;
}

/// Source used by offline builds; never reaches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl ReleaseSource for OfflineSource {
    async fn releases(&self, _repo: &RepoRef) -> Result<Vec<PublishedRelease>> {
        Err(EnrichmentError::Disabled)
    }
}
