//! Check command - validate configuration and manifests

use std::{collections::HashMap, path::Path};

use color_eyre::eyre::{Result, bail};
use den_core::Config;
use den_generator::{ManifestCollector, collector::parse_file};

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    checked: usize,
    errors: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Run the check command.
///
/// Parses every manifest without building anything and fails if any of them
/// is invalid.
pub fn run(config_path: &Path, formula_dir: Option<&Path>, casks_dir: Option<&Path>) -> Result<()> {
    tracing::info!(?config_path, "Checking configuration and manifests");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let mut config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            c
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration invalid: {e}");
            Config::default()
        }
    };

    if let Some(dir) = formula_dir {
        config.build.formula_dir = dir.to_path_buf();
    }
    if let Some(dir) = casks_dir {
        config.build.casks_dir = dir.to_path_buf();
    }

    println!("\nChecking manifests...");
    check_manifests(&config, &mut result);

    println!();
    println!("Summary:");
    println!("  Manifests: {}", result.checked);
    println!("  Errors:    {}", result.errors.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Parse every manifest, printing one line per file.
fn check_manifests(config: &Config, result: &mut ValidationResult) {
    let collector = ManifestCollector::new(&config.build.formula_dir, &config.build.casks_dir);
    let files = match collector.find_manifests() {
        Ok(files) => files,
        Err(e) => {
            result.add_error(format!("Failed to list manifests: {e}"));
            return;
        }
    };

    if files.is_empty() {
        println!("  ⚠ No manifests found");
        return;
    }

    let mut seen: HashMap<String, &Path> = HashMap::new();
    for file in &files {
        result.checked += 1;
        match parse_file(file) {
            Ok(package) => {
                if let Some(first) = seen.insert(package.name.clone(), &file.path) {
                    let msg = format!(
                        "{}: duplicate package `{}` (also in {})",
                        file.path.display(),
                        package.name,
                        first.display()
                    );
                    println!("  ✗ {msg}");
                    result.add_error(msg);
                } else {
                    println!(
                        "  ✓ {} {} ({}, {})",
                        package.kind, package.name, package.version, package.stability
                    );
                }
            }
            Err(e) => {
                println!("  ✗ {e}");
                result.add_error(e.to_string());
            }
        }
    }
}
