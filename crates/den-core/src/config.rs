//! Site configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Den. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Release history settings.
    #[serde(default)]
    pub releases: ReleasesConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Site description for meta tags.
    #[serde(default = "default_description")]
    pub description: String,

    /// Tap name used in install commands, e.g. `mrdemonwolf/den`.
    #[serde(default = "default_tap")]
    pub tap: String,

    /// Copyright holder shown in the footer.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// License of the tap itself.
    #[serde(default = "default_license")]
    pub license: String,

    /// Footer year. The current year when unset.
    #[serde(default)]
    pub copyright_year: Option<i32>,

    /// Link to the tap repository.
    #[serde(default)]
    pub repository: Option<String>,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding formula manifests.
    #[serde(default = "default_formula_dir")]
    pub formula_dir: PathBuf,

    /// Directory holding cask manifests.
    #[serde(default = "default_casks_dir")]
    pub casks_dir: PathBuf,

    /// Static assets copied verbatim into the output.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Output directory for generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory with `index.html` / `formula.html` template overrides.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// Release history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesConfig {
    /// Whether release history is fetched at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the hosting API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Maximum fetches in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-package fetch timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding an API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Maximum release pages fetched per package.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

// Default value functions
fn default_title() -> String {
    "Homebrew Den".to_string()
}

fn default_description() -> String {
    "Homebrew tap catalog: formulae and casks with install commands and release history."
        .to_string()
}

fn default_tap() -> String {
    "mrdemonwolf/den".to_string()
}

fn default_owner() -> String {
    "MrDemonWolf".to_string()
}

fn default_license() -> String {
    "MIT".to_string()
}

fn default_formula_dir() -> PathBuf {
    PathBuf::from("Formula")
}

fn default_casks_dir() -> PathBuf {
    PathBuf::from("Casks")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_max_pages() -> u32 {
    5
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            tap: default_tap(),
            owner: default_owner(),
            license: default_license(),
            copyright_year: None,
            repository: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            formula_dir: default_formula_dir(),
            casks_dir: default_casks_dir(),
            static_dir: default_static_dir(),
            output_dir: default_output_dir(),
            templates_dir: None,
        }
    }
}

impl Default for ReleasesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_api_base(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
            max_pages: default_max_pages(),
        }
    }
}

impl Config {
    /// Load configuration from `path` with `DEN__SECTION__KEY` environment
    /// overrides. A missing file leaves every setting at its default.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let context = || format!("Failed to parse config file: {}", path.display());

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
        }

        let config: Config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("DEN").separator("__"))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| CoreError::config_with_source(context(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.trim().is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.releases.concurrency == 0 {
            return Err(CoreError::config("releases.concurrency must be at least 1"));
        }

        if self.releases.timeout_secs == 0 {
            return Err(CoreError::config("releases.timeout_secs must be at least 1"));
        }

        if self.site.tap.split('/').count() != 2 {
            tracing::warn!(tap = %self.site.tap, "site.tap should look like <user>/<repo>");
        }

        Ok(())
    }

    /// API token from the configured environment variable, if set.
    #[must_use]
    pub fn release_token(&self) -> Option<String> {
        std::env::var(&self.releases.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}
