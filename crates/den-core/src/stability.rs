//! Release stability classification.
//!
//! A package's stability is derived from its version string and, when known,
//! the hosting API's own pre-release marker. Version suffixes always win.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

static SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-(alpha|beta|rc|dev|canary|nightly|preview)").expect("valid suffix regex")
});

/// Stability tag shown next to every package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stability {
    Alpha,
    Beta,
    Rc,
    PreRelease,
    Stable,
}

impl Stability {
    /// All tags, from least to most stable.
    pub const ALL: [Stability; 5] = [
        Self::Alpha,
        Self::Beta,
        Self::Rc,
        Self::PreRelease,
        Self::Stable,
    ];

    /// The serialized form of the tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
            Self::PreRelease => "pre-release",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown stability tag: {s}"))
    }
}

/// Classify a version.
///
/// Precedence: a `-alpha|-beta|-rc|-dev|-canary|-nightly|-preview` suffix,
/// then the pre-release flag, then a `0.` major version, then stable.
#[must_use]
pub fn classify(version: &str, is_prerelease: bool) -> Stability {
    if let Some(caps) = SUFFIX.captures(version) {
        return match caps[1].to_ascii_lowercase().as_str() {
            "alpha" => Stability::Alpha,
            "beta" => Stability::Beta,
            "rc" => Stability::Rc,
            _ => Stability::PreRelease,
        };
    }

    if is_prerelease {
        return Stability::PreRelease;
    }

    if version.starts_with("0.") {
        return Stability::Alpha;
    }

    Stability::Stable
}
