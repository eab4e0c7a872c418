//! Den CLI
//!
//! Generates a static catalog site for a Homebrew tap.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use den::cmd::build::BuildArgs;

/// Command-line interface for Den.
#[derive(Parser)]
#[command(
    name = "den",
    version,
    about = "Static catalog site generator for Homebrew taps"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "den.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the catalog site
    Build {
        /// Formula manifest directory
        #[arg(long)]
        formula_dir: Option<PathBuf>,
        /// Cask manifest directory
        #[arg(long)]
        casks_dir: Option<PathBuf>,
        /// Static assets directory
        #[arg(long)]
        static_dir: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip fetching release history
        #[arg(long)]
        offline: bool,
        /// Directory with template overrides
        #[arg(long)]
        templates: Option<PathBuf>,
    },
    /// Validate configuration and manifests
    Check {
        /// Formula manifest directory
        #[arg(long)]
        formula_dir: Option<PathBuf>,
        /// Cask manifest directory
        #[arg(long)]
        casks_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    den::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            formula_dir,
            casks_dir,
            static_dir,
            output,
            offline,
            templates,
        } => {
            let args = BuildArgs {
                formula_dir,
                casks_dir,
                static_dir,
                output,
                templates,
                offline,
            };
            den::cmd::build::run(&cli.config, &args).await?;
        }
        Commands::Check {
            formula_dir,
            casks_dir,
        } => {
            den::cmd::check::run(&cli.config, formula_dir.as_deref(), casks_dir.as_deref())?;
        }
    }

    Ok(())
}
