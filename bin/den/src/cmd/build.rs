//! Build command - generates the catalog site

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use color_eyre::eyre::{Result, WrapErr};
use den_core::Config;
use den_generator::{BuildStats, Builder};

/// Directory overrides and flags for `den build`.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    pub formula_dir: Option<PathBuf>,
    pub casks_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub templates: Option<PathBuf>,
    pub offline: bool,
}

impl BuildArgs {
    /// Apply CLI overrides on top of file and environment settings.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.formula_dir {
            config.build.formula_dir.clone_from(dir);
        }
        if let Some(dir) = &self.casks_dir {
            config.build.casks_dir.clone_from(dir);
        }
        if let Some(dir) = &self.static_dir {
            config.build.static_dir.clone_from(dir);
        }
        if let Some(dir) = &self.output {
            config.build.output_dir.clone_from(dir);
        }
        if let Some(dir) = &self.templates {
            config.build.templates_dir = Some(dir.clone());
        }
        if self.offline {
            config.releases.enabled = false;
        }
    }
}

/// Run the build command.
///
/// Collects every manifest, fetches release history and writes the site to
/// the output directory.
pub async fn run(config_path: &Path, args: &BuildArgs) -> Result<BuildStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?args, "Starting build");

    let mut config =
        Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    args.apply(&mut config);
    tracing::debug!(?config, "Loaded configuration");

    let output = config.build.output_dir.clone();
    let stats = Builder::new(config)
        .build()
        .await
        .wrap_err("Build failed")?;

    let duration = start.elapsed();

    println!();
    println!("  Site built successfully");
    println!();
    println!("  Formulae:   {}", stats.formulae);
    println!("  Casks:      {}", stats.casks);
    println!("  Pages:      {}", stats.pages);
    println!("  Assets:     {}", stats.assets);
    if stats.degraded > 0 {
        println!("  No history: {}", stats.degraded);
    }
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", output.display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}
