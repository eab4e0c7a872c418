//! Den Core Library
//!
//! Core types, manifest parsing, stability classification and configuration
//! for the Den tap catalog site generator.

pub mod config;
pub mod error;
pub mod manifest;
pub mod package;
pub mod stability;

pub use config::Config;
pub use error::{CoreError, Result};
pub use manifest::{ManifestError, ManifestIr, parse_manifest};
pub use package::{Catalog, Download, Package, PackageKind, VersionRecord};
pub use stability::{Stability, classify};
