//! Release enrichment errors.
//!
//! None of these stop a build: the enricher turns each into an empty release
//! history and a warning.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using `EnrichmentError`.
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Why release history for a package could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// Homepage is not a repository on a supported host.
    #[error("unsupported repository host: {homepage}")]
    UnsupportedHost { homepage: String },

    /// Transport failure or unexpected status.
    #[error("HTTP error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// The API refused the request for quota reasons.
    #[error("rate limited by release API (HTTP {status})")]
    RateLimited { status: u16 },

    /// Repository does not exist or is private.
    #[error("repository {repo} not found")]
    NotFound { repo: String },

    /// Repository has no published releases.
    #[error("repository {repo} has no releases")]
    NoReleases { repo: String },

    /// Response body was not the expected JSON.
    #[error("failed to decode release list: {0}")]
    Decode(String),

    /// Fetch exceeded the per-package time limit.
    #[error("release fetch timed out after {after:?}")]
    Timeout { after: Duration },

    /// Release fetching is turned off.
    #[error("release fetching disabled")]
    Disabled,
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = EnrichmentError::Http {
            status: Some(500),
            message: "server error".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 500: server error");

        let err = EnrichmentError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn test_timeout_display_keeps_subsecond_limits() {
        let err = EnrichmentError::Timeout {
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "release fetch timed out after 250ms");

        let err = EnrichmentError::Timeout {
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "release fetch timed out after 10s");
    }
}
