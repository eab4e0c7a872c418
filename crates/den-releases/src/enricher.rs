//! Concurrent release history enrichment.
//!
//! One future per package, at most `concurrency` in flight, each bounded by a
//! timeout. Failures are values: a package whose history cannot be fetched
//! gets an empty history and is reported as degraded.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use den_core::{Package, VersionRecord};
use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::{
    error::{EnrichmentError, Result},
    github::normalize_tag,
    source::{ReleaseSource, RepoRef},
};

/// Release history for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseHistory {
    /// Newest first.
    pub versions: Vec<VersionRecord>,
    /// Host pre-release marker of the release matching the manifest version.
    pub is_prerelease: bool,
}

/// Outcome of enriching a set of packages.
#[derive(Debug, Default)]
pub struct EnrichReport {
    /// History per package name. Degraded packages map to an empty history.
    pub histories: BTreeMap<String, ReleaseHistory>,
    /// Names of packages whose history could not be fetched.
    pub degraded: Vec<String>,
}

impl EnrichReport {
    /// History for `name`, empty when absent.
    #[must_use]
    pub fn take(&mut self, name: &str) -> ReleaseHistory {
        self.histories.remove(name).unwrap_or_default()
    }
}

/// Fetches release histories through a [`ReleaseSource`].
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn ReleaseSource>,
    concurrency: usize,
    timeout: Duration,
}

impl Enricher {
    /// Create an enricher over `source`.
    pub fn new(source: Arc<dyn ReleaseSource>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Fetch the history of a single package.
    pub async fn enrich(&self, package: &Package) -> Result<ReleaseHistory> {
        let repo = RepoRef::from_homepage(&package.homepage)?;
        let fetch = self.source.releases(&repo);
        let releases = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| EnrichmentError::Timeout {
                after: self.timeout,
            })??;

        let is_prerelease = releases
            .iter()
            .find(|r| r.record.version == normalize_tag(&package.version))
            .is_some_and(|r| r.prerelease);

        Ok(ReleaseHistory {
            versions: releases.into_iter().map(|r| r.record).collect(),
            is_prerelease,
        })
    }

    /// Fetch histories for every package. Never fails.
    pub async fn enrich_all(&self, packages: &[Package]) -> EnrichReport {
        info!(
            packages = packages.len(),
            concurrency = self.concurrency,
            "fetching release history"
        );

        let results: Vec<(String, Result<ReleaseHistory>)> = stream::iter(packages)
            .map(|package| async move { (package.name.clone(), self.enrich(package).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = EnrichReport::default();
        for (name, result) in results {
            match result {
                Ok(history) => {
                    debug!(package = %name, versions = history.versions.len(), "release history");
                    report.histories.insert(name, history);
                }
                Err(EnrichmentError::Disabled) => {
                    debug!(package = %name, "release fetching disabled");
                    report.histories.insert(name.clone(), ReleaseHistory::default());
                    report.degraded.push(name);
                }
                Err(err) => {
                    warn!(package = %name, error = %err, "release history unavailable");
                    report.histories.insert(name.clone(), ReleaseHistory::default());
                    report.degraded.push(name);
                }
            }
        }
        report.degraded.sort();
        report
    }
}
