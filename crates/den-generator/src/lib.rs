//! Den Generator Library
//!
//! Static catalog site generation for a Homebrew tap.
//!
//! # Modules
//!
//! - [`template`] - Typed HTML templates with load-time placeholder checks
//! - [`html`] - Index and package detail page generation
//! - [`payload`] - JSON data embedded in pages
//! - [`collector`] - Manifest discovery and parsing
//! - [`assets`] - Static asset copying
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod collector;
pub mod html;
pub mod payload;
pub mod template;

pub use assets::{AssetManifest, AssetProcessor};
pub use build::{BuildError, BuildStats, Builder};
pub use collector::{CollectorError, ManifestCollector};
pub use html::HtmlGenerator;
pub use template::{Template, TemplateContext, TemplateId, TemplateRegistry};
