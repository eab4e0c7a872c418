//! Den Releases
//!
//! Fetches per-package release history from the repository host and turns
//! fetch failures into empty histories.

pub mod enricher;
pub mod error;
pub mod github;
pub mod source;

pub use enricher::{EnrichReport, Enricher, ReleaseHistory};
pub use error::{EnrichmentError, Result};
pub use github::GitHubReleases;
pub use source::{OfflineSource, PublishedRelease, ReleaseSource, RepoRef};
