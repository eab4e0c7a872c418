//! Den CLI Library
//!
//! Command implementations for the `den` binary. Builds a static catalog
//! site for a Homebrew tap from its formula and cask manifests.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use den::cmd::build::{self, BuildArgs};
//!
//! # async fn run() -> color_eyre::eyre::Result<()> {
//! build::run(Path::new("den.toml"), &BuildArgs::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cmd;

pub use den_core::{Config, Package};
pub use den_generator::{BuildStats, Builder, ManifestCollector};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
