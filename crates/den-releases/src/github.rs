//! GitHub releases API client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use den_core::{VersionRecord, config::ReleasesConfig};
use reqwest::{StatusCode, header};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{
    error::{EnrichmentError, Result},
    source::{PublishedRelease, ReleaseSource, RepoRef},
};

/// Releases requested per page; the API maximum.
const PER_PAGE: usize = 100;

const USER_AGENT: &str = concat!("den/", env!("CARGO_PKG_VERSION"));

/// One entry of `GET /repos/{owner}/{repo}/releases`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// [`ReleaseSource`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    max_pages: u32,
}

impl GitHubReleases {
    /// Create a client for `config`, authenticating with `token` when given.
    pub fn new(config: &ReleasesConfig, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            max_pages: config.max_pages.max(1),
        })
    }

    fn releases_url(&self, repo: &RepoRef, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page={PER_PAGE}&page={page}",
            self.api_base, repo.owner, repo.repo
        )
    }

    async fn fetch_page(&self, repo: &RepoRef, page: u32) -> Result<Vec<GitHubRelease>> {
        let url = self.releases_url(repo, page);
        trace!(%url, "fetching releases page");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        match status {
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                return Err(EnrichmentError::RateLimited {
                    status: status.as_u16(),
                });
            }
            StatusCode::NOT_FOUND => {
                return Err(EnrichmentError::NotFound {
                    repo: repo.to_string(),
                });
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(EnrichmentError::Http {
                    status: Some(s.as_u16()),
                    message: body.chars().take(200).collect(),
                });
            }
            _ => {}
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleases {
    async fn releases(&self, repo: &RepoRef) -> Result<Vec<PublishedRelease>> {
        let mut raw = Vec::new();
        for page in 1..=self.max_pages {
            let batch = self.fetch_page(repo, page).await?;
            let short = batch.len() < PER_PAGE;
            raw.extend(batch);
            if short {
                break;
            }
        }

        if raw.is_empty() {
            return Err(EnrichmentError::NoReleases {
                repo: repo.to_string(),
            });
        }

        let releases = to_published(raw);
        debug!(%repo, count = releases.len(), "fetched releases");
        Ok(releases)
    }
}

/// Drop drafts and unpublished entries, then order newest first.
///
/// Ties on the publication time are broken by tag, descending.
#[must_use]
pub fn to_published(raw: Vec<GitHubRelease>) -> Vec<PublishedRelease> {
    let mut dated: Vec<(DateTime<Utc>, GitHubRelease)> = raw
        .into_iter()
        .filter(|r| !r.draft)
        .filter_map(|r| r.published_at.map(|at| (at, r)))
        .collect();

    dated.sort_by(|(a_at, a), (b_at, b)| b_at.cmp(a_at).then_with(|| b.tag_name.cmp(&a.tag_name)));

    dated
        .into_iter()
        .map(|(at, r)| PublishedRelease {
            record: VersionRecord {
                version: normalize_tag(&r.tag_name).to_string(),
                date: at.format("%Y-%m-%d").to_string(),
                tag: r.tag_name,
                url: r.html_url,
            },
            prerelease: r.prerelease,
        })
        .collect()
}

/// Strip a leading `v`/`V` from a release tag.
#[must_use]
pub fn normalize_tag(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEASES_JSON: &str = r#"[
      {
        "tag_name": "v0.0.5",
        "html_url": "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.5",
        "draft": false,
        "prerelease": false,
        "published_at": "2026-01-10T08:00:00Z"
      },
      {
        "tag_name": "v0.0.7",
        "html_url": "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.7",
        "draft": true,
        "prerelease": false,
        "published_at": null
      },
      {
        "tag_name": "v0.0.6",
        "html_url": "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.6",
        "draft": false,
        "prerelease": true,
        "published_at": "2026-02-01T23:59:59Z",
        "assets": []
      },
      {
        "tag_name": "nightly",
        "html_url": "https://github.com/MrDemonWolf/iconwolf/releases/tag/nightly",
        "draft": false,
        "prerelease": true,
        "published_at": null
      }
    ]"#;

    fn fixture() -> Vec<GitHubRelease> {
        serde_json::from_str(RELEASES_JSON).unwrap()
    }

    #[test]
    fn test_to_published_filters_and_sorts() {
        let releases = to_published(fixture());
        let tags: Vec<_> = releases.iter().map(|r| r.record.tag.as_str()).collect();
        assert_eq!(tags, ["v0.0.6", "v0.0.5"]);

        let newest = &releases[0];
        assert_eq!(newest.record.version, "0.0.6");
        assert_eq!(newest.record.date, "2026-02-01");
        assert_eq!(
            newest.record.url,
            "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.6"
        );
        assert!(newest.prerelease);
        assert!(!releases[1].prerelease);
    }

    #[test]
    fn test_same_timestamp_orders_by_tag() {
        let at: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();
        let make = |tag: &str| GitHubRelease {
            tag_name: tag.to_string(),
            html_url: format!("https://example.com/{tag}"),
            draft: false,
            prerelease: false,
            published_at: Some(at),
        };

        let releases = to_published(vec![make("v1.0.0"), make("v1.1.0"), make("v1.0.1")]);
        let tags: Vec<_> = releases.iter().map(|r| r.record.tag.as_str()).collect();
        assert_eq!(tags, ["v1.1.0", "v1.0.1", "v1.0.0"]);
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("v1.2.3"), "1.2.3");
        assert_eq!(normalize_tag("V2.0"), "2.0");
        assert_eq!(normalize_tag("1.0"), "1.0");
        assert_eq!(normalize_tag("release-1"), "release-1");
    }

    #[test]
    fn test_releases_url() {
        let config = ReleasesConfig {
            api_base: "https://ghe.example.com/api/v3/".to_string(),
            ..ReleasesConfig::default()
        };
        let client = GitHubReleases::new(&config, None).unwrap();
        let repo = RepoRef::from_homepage("https://github.com/MrDemonWolf/iconwolf").unwrap();
        assert_eq!(
            client.releases_url(&repo, 2),
            "https://ghe.example.com/api/v3/repos/MrDemonWolf/iconwolf/releases?per_page=100&page=2"
        );
    }
}
