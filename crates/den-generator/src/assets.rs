//! Static asset copying.
//!
//! The static directory is copied verbatim into the output root. Pages link
//! the stylesheet and icon by fixed names, so those files must be present,
//! and no static file may land on a generated page.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

/// Assets every page links to.
pub const REQUIRED_ASSETS: &[&str] = &["output.css", "favicon.svg"];

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),

    /// A required asset is absent from the static directory.
    #[error("required asset `{name}` not found in {dir}")]
    Missing { name: String, dir: PathBuf },

    /// A static file would overwrite a generated page.
    #[error("static file {path} conflicts with a generated page")]
    Conflict { path: PathBuf },
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Relative paths of the copied assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    assets: BTreeSet<PathBuf>,
}

impl AssetManifest {
    /// Number of copied files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether nothing was copied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Whether `relative` is an output path owned by the page generator.
fn is_generated_path(relative: &Path) -> bool {
    relative == Path::new("index.html") || relative.starts_with("formulae")
}

/// Copies static files into the output directory.
#[derive(Debug, Default)]
pub struct AssetProcessor;

impl AssetProcessor {
    /// Create a processor requiring [`REQUIRED_ASSETS`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fail unless every required asset exists in `source_dir` and no static
    /// file shadows a generated page.
    pub fn check(&self, source_dir: &Path) -> Result<()> {
        for name in REQUIRED_ASSETS {
            if !source_dir.join(name).is_file() {
                return Err(AssetError::Missing {
                    name: (*name).to_string(),
                    dir: source_dir.to_path_buf(),
                });
            }
        }

        let mut files = Vec::new();
        collect_files(source_dir, source_dir, &mut files)?;
        if let Some(path) = files.into_iter().find(|p| is_generated_path(p)) {
            return Err(AssetError::Conflict { path });
        }
        Ok(())
    }

    /// Copy all assets from source to destination directory.
    pub fn process(&self, source_dir: &Path, dest_dir: &Path) -> Result<AssetManifest> {
        info!(
            source = %source_dir.display(),
            dest = %dest_dir.display(),
            "copying assets"
        );

        self.check(source_dir)?;

        let mut files = Vec::new();
        collect_files(source_dir, source_dir, &mut files)?;

        let mut manifest = AssetManifest::default();
        for relative in files {
            self.process_file(source_dir, &relative, dest_dir)?;
            manifest.assets.insert(relative);
        }

        info!(count = manifest.len(), "assets copied");
        Ok(manifest)
    }

    /// Copy a single file.
    fn process_file(&self, base_dir: &Path, relative: &Path, dest_base: &Path) -> Result<()> {
        let src_path = base_dir.join(relative);
        let dest_path = dest_base.join(relative);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::copy(&src_path, &dest_path)?;
        debug!(
            src = %src_path.display(),
            dest = %dest_path.display(),
            "copied asset"
        );
        Ok(())
    }
}

/// Relative paths of every non-hidden file under `current_dir`, sorted.
fn collect_files(base_dir: &Path, current_dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(current_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        // Skip hidden files/directories
        if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'))
        {
            continue;
        }

        if path.is_dir() {
            collect_files(base_dir, &path, files)?;
        } else if path.is_file() {
            let relative = path
                .strip_prefix(base_dir)
                .map_err(|_| AssetError::InvalidPath(path.clone()))?;
            files.push(relative.to_path_buf());
        }
    }

    Ok(())
}
