//! Package and catalog types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stability::{Stability, classify};

/// Manifest family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Command-line software built or unpacked by `brew install`.
    Formula,
    /// Application bundles installed with `brew install --cask`.
    Cask,
}

impl PackageKind {
    /// Anchor of the index section listing this family.
    #[must_use]
    pub fn section_id(self) -> &'static str {
        match self {
            Self::Formula => "formulae-section",
            Self::Cask => "casks-section",
        }
    }

    /// Human readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Formula => "Formula",
            Self::Cask => "Cask",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formula => f.write_str("formula"),
            Self::Cask => f.write_str("cask"),
        }
    }
}

/// A download URL paired with its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub url: String,
    pub sha256: String,
}

/// One published release of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Tag with any leading `v` removed.
    pub version: String,
    /// Raw release tag.
    pub tag: String,
    /// Publication date, `YYYY-MM-DD`.
    pub date: String,
    /// Release page.
    pub url: String,
}

/// A fully assembled package, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub kind: PackageKind,
    pub desc: String,
    pub homepage: String,
    pub version: String,
    pub license: String,
    pub stability: Stability,
    /// Free text shown verbatim, empty when the manifest declares none.
    #[serde(default)]
    pub caveats: String,
    pub urls: Vec<Download>,
    /// Newest first. Empty when release history could not be fetched.
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
}

impl Package {
    /// Attach release history and reclassify with the hosting API's
    /// pre-release marker for the current version.
    #[must_use]
    pub fn with_history(mut self, versions: Vec<VersionRecord>, is_prerelease: bool) -> Self {
        self.stability = classify(&self.version, is_prerelease);
        self.versions = versions;
        self
    }

    /// Page path relative to the site root.
    #[must_use]
    pub fn page_path(&self) -> String {
        format!("formulae/{}/index.html", self.name)
    }

    /// Install command shown on the detail page.
    #[must_use]
    pub fn install_command(&self, tap: &str) -> String {
        match self.kind {
            PackageKind::Formula => format!("brew install {tap}/{}", self.name),
            PackageKind::Cask => format!("brew install --cask {tap}/{}", self.name),
        }
    }
}

/// Every package in the tap, grouped by family and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub formulae: Vec<Package>,
    pub casks: Vec<Package>,
}

impl Catalog {
    /// Group packages by family. Each group is sorted by name.
    #[must_use]
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let (mut formulae, mut casks): (Vec<_>, Vec<_>) = packages
            .into_iter()
            .partition(|p| p.kind == PackageKind::Formula);
        formulae.sort_by(|a, b| a.name.cmp(&b.name));
        casks.sort_by(|a, b| a.name.cmp(&b.name));
        Self { formulae, casks }
    }

    /// All packages, formulae first.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.formulae.iter().chain(self.casks.iter())
    }

    /// Total number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formulae.len() + self.casks.len()
    }

    /// Whether the catalog holds no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, kind: PackageKind) -> Package {
        Package {
            name: name.to_string(),
            kind,
            desc: "A sample package".to_string(),
            homepage: format!("https://github.com/example/{name}"),
            version: "1.2.0".to_string(),
            license: "MIT".to_string(),
            stability: Stability::Stable,
            caveats: String::new(),
            urls: vec![Download {
                url: format!("https://example.com/{name}.tar.gz"),
                sha256: "a".repeat(64),
            }],
            versions: vec![],
        }
    }

    #[test]
    fn test_catalog_groups_and_sorts() {
        let catalog = Catalog::from_packages([
            sample("zeta", PackageKind::Formula),
            sample("app", PackageKind::Cask),
            sample("alpha", PackageKind::Formula),
        ]);

        let formulae: Vec<_> = catalog.formulae.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(formulae, ["alpha", "zeta"]);
        assert_eq!(catalog.casks.len(), 1);
        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_with_history_reclassifies() {
        let pkg = sample("tool", PackageKind::Formula);
        let history = vec![VersionRecord {
            version: "1.2.0".to_string(),
            tag: "v1.2.0".to_string(),
            date: "2026-01-02".to_string(),
            url: "https://github.com/example/tool/releases/tag/v1.2.0".to_string(),
        }];

        let pkg = pkg.with_history(history.clone(), true);
        assert_eq!(pkg.stability, Stability::PreRelease);
        assert_eq!(pkg.versions, history);
    }

    #[test]
    fn test_install_command() {
        let formula = sample("iconwolf", PackageKind::Formula);
        assert_eq!(
            formula.install_command("mrdemonwolf/den"),
            "brew install mrdemonwolf/den/iconwolf"
        );
        let cask = sample("wolfapp", PackageKind::Cask);
        assert_eq!(
            cask.install_command("mrdemonwolf/den"),
            "brew install --cask mrdemonwolf/den/wolfapp"
        );
    }

    #[test]
    fn test_json_shape() {
        let pkg = sample("iconwolf", PackageKind::Formula);
        let value = serde_json::to_value(&pkg).unwrap();
        assert_eq!(value["kind"], "formula");
        assert_eq!(value["stability"], "stable");
        assert!(value["versions"].as_array().unwrap().is_empty());
        assert_eq!(value["urls"][0]["sha256"].as_str().unwrap().len(), 64);
    }
}
