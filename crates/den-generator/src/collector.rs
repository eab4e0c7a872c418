//! Manifest collection.
//!
//! Walks the formula and cask directories and parses every manifest into a
//! [`Package`]. Any invalid manifest fails the whole collection.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use den_core::{
    ManifestError, Package, PackageKind,
    manifest::{is_manifest, manifest_name, parse_manifest},
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Manifest collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// IO error.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory walk error.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A manifest failed validation.
    #[error("{path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Two manifests declare the same package name.
    #[error("duplicate package `{name}` in {first} and {second}")]
    Duplicate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl CollectorError {
    /// The manifest error, if this is one.
    #[must_use]
    pub fn manifest_error(&self) -> Option<&ManifestError> {
        match self {
            Self::Manifest { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// A manifest file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub kind: PackageKind,
}

/// Collects manifests from the formula and cask directories.
#[derive(Debug, Clone)]
pub struct ManifestCollector {
    formula_dir: PathBuf,
    casks_dir: PathBuf,
}

impl ManifestCollector {
    /// Create a collector over the two manifest directories.
    #[must_use]
    pub fn new(formula_dir: impl Into<PathBuf>, casks_dir: impl Into<PathBuf>) -> Self {
        Self {
            formula_dir: formula_dir.into(),
            casks_dir: casks_dir.into(),
        }
    }

    /// Find every manifest file, formulae first, each family sorted by path.
    pub fn find_manifests(&self) -> Result<Vec<ManifestFile>> {
        let mut files = find_in(&self.formula_dir, PackageKind::Formula)?;
        files.extend(find_in(&self.casks_dir, PackageKind::Cask)?);
        Ok(files)
    }

    /// Parse every manifest.
    ///
    /// Packages are returned in [`find_manifests`](Self::find_manifests)
    /// order. The first invalid manifest in that order is reported.
    pub fn collect(&self) -> Result<Vec<Package>> {
        let files = self.find_manifests()?;
        info!(count = files.len(), "found manifests");

        let packages = files
            .par_iter()
            .map(parse_file)
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashMap<&str, &Path> = HashMap::new();
        for (package, file) in packages.iter().zip(&files) {
            if let Some(first) = seen.insert(&package.name, &file.path) {
                return Err(CollectorError::Duplicate {
                    name: package.name.clone(),
                    first: first.to_path_buf(),
                    second: file.path.clone(),
                });
            }
        }

        info!(packages = packages.len(), "manifest collection complete");
        Ok(packages)
    }
}

/// Parse a single manifest file.
pub fn parse_file(file: &ManifestFile) -> Result<Package> {
    debug!(path = %file.path.display(), kind = %file.kind, "parsing manifest");

    let source = fs::read_to_string(&file.path).map_err(|source| CollectorError::Io {
        path: file.path.clone(),
        source,
    })?;
    let name = manifest_name(&file.path).unwrap_or_default();

    parse_manifest(&source, &name, file.kind).map_err(|source| CollectorError::Manifest {
        path: file.path.clone(),
        source,
    })
}

fn find_in(dir: &Path, kind: PackageKind) -> Result<Vec<ManifestFile>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "manifest directory missing, skipping");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_manifest(entry.path()) {
            files.push(ManifestFile {
                path: entry.into_path(),
                kind,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
