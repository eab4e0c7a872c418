//! Build orchestration.
//!
//! Coordinates the full site build: collect manifests, enrich them with
//! release history, render every page in memory, then replace the output
//! directory. Nothing is written until every page has rendered.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use den_core::{Catalog, Config, Package};
use den_releases::{Enricher, GitHubReleases, OfflineSource, ReleaseSource};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetError, AssetProcessor},
    collector::{CollectorError, ManifestCollector},
    html::{HtmlError, HtmlGenerator, RenderedPage},
    template::{TemplateError, TemplateRegistry},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Collector error.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Template loading error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// HTML generation error.
    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of formulae.
    pub formulae: usize,

    /// Number of casks.
    pub casks: usize,

    /// Number of HTML pages written, index included.
    pub pages: usize,

    /// Number of static assets copied.
    pub assets: usize,

    /// Packages rendered without release history.
    pub degraded: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Site builder that orchestrates the build process.
pub struct Builder {
    config: Config,
    formula_dir: PathBuf,
    casks_dir: PathBuf,
    output_dir: PathBuf,
    static_dir: PathBuf,
    templates_dir: Option<PathBuf>,
    source: Option<Arc<dyn ReleaseSource>>,
}

impl Builder {
    /// Create a builder using the directories from `config.build`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            formula_dir: config.build.formula_dir.clone(),
            casks_dir: config.build.casks_dir.clone(),
            output_dir: config.build.output_dir.clone(),
            static_dir: config.build.static_dir.clone(),
            templates_dir: config.build.templates_dir.clone(),
            source: None,
            config,
        }
    }

    /// Set the formula manifest directory.
    #[must_use]
    pub fn with_formula_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.formula_dir = dir.into();
        self
    }

    /// Set the cask manifest directory.
    #[must_use]
    pub fn with_casks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.casks_dir = dir.into();
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the static assets directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Load template overrides from `dir`.
    #[must_use]
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    /// Use `source` for release history instead of the configured host.
    #[must_use]
    pub fn with_release_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Skip release history entirely.
    #[must_use]
    pub fn offline(self) -> Self {
        self.with_release_source(Arc::new(OfflineSource))
    }

    /// The output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build process.
    pub async fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            formula = %self.formula_dir.display(),
            casks = %self.casks_dir.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 0. Refuse to clean a directory holding the inputs
        self.check_output_dir()?;

        // 1. Collect and validate manifests
        let collector = ManifestCollector::new(&self.formula_dir, &self.casks_dir);
        let packages = collector.collect()?;

        // 2. Fetch release history
        let enricher = Enricher::new(
            self.release_source(),
            self.config.releases.concurrency,
            Duration::from_secs(self.config.releases.timeout_secs),
        );
        let mut report = enricher.enrich_all(&packages).await;
        stats.degraded = report.degraded.len();

        // 3. Reclassify with release data
        let packages: Vec<Package> = packages
            .into_iter()
            .map(|package| {
                let history = report.take(&package.name);
                package.with_history(history.versions, history.is_prerelease)
            })
            .collect();
        let catalog = Catalog::from_packages(packages);
        stats.formulae = catalog.formulae.len();
        stats.casks = catalog.casks.len();

        // 4. Render every page in memory
        let pages = self.render_pages(&catalog)?;
        let assets = AssetProcessor::new();
        assets.check(&self.static_dir)?;

        // 5. Clean output directory
        self.clean_output()?;

        // 6. Write pages
        stats.pages = self.write_pages(&pages)?;

        // 7. Copy static assets
        stats.assets = assets.process(&self.static_dir, &self.output_dir)?.len();

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            formulae = stats.formulae,
            casks = stats.casks,
            pages = stats.pages,
            assets = stats.assets,
            degraded = stats.degraded,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Fail if the output directory is, or contains, an input directory.
    fn check_output_dir(&self) -> Result<()> {
        let output = resolve(&self.output_dir);
        let inputs = [
            Some(&self.formula_dir),
            Some(&self.casks_dir),
            Some(&self.static_dir),
            self.templates_dir.as_ref(),
        ];
        for input in inputs.into_iter().flatten() {
            if resolve(input).starts_with(&output) {
                return Err(BuildError::Config(format!(
                    "output directory {} would remove input directory {}",
                    self.output_dir.display(),
                    input.display()
                )));
            }
        }
        Ok(())
    }

    fn release_source(&self) -> Arc<dyn ReleaseSource> {
        if let Some(source) = &self.source {
            return Arc::clone(source);
        }
        if !self.config.releases.enabled {
            debug!("release history disabled by configuration");
            return Arc::new(OfflineSource);
        }
        match GitHubReleases::new(&self.config.releases, self.config.release_token()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "release client unavailable, building without history");
                Arc::new(OfflineSource)
            }
        }
    }

    fn render_pages(&self, catalog: &Catalog) -> Result<Vec<RenderedPage>> {
        let templates = match &self.templates_dir {
            Some(dir) => TemplateRegistry::from_dir(dir)?,
            None => TemplateRegistry::new()?,
        };
        let generator = HtmlGenerator::new(self.config.site.clone(), templates);

        info!(count = catalog.len() + 1, "rendering pages");
        Ok(generator.render_site(catalog)?)
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        if self.output_dir.exists() {
            debug!(dir = %self.output_dir.display(), "cleaning output directory");
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn write_pages(&self, pages: &[RenderedPage]) -> Result<usize> {
        for page in pages {
            let output_path = self.output_dir.join(&page.path);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, &page.html)?;
            debug!(path = %output_path.display(), "wrote page");
        }
        Ok(pages.len())
    }
}

/// Absolute form of `path` with symlinks resolved for the part that exists.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
