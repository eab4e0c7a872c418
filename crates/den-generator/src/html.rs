//! HTML generation for the catalog pages.
//!
//! Builds typed template contexts for the index and for each package detail
//! page, escaping every manifest-supplied string on the way in.

use std::path::PathBuf;

use chrono::{Datelike, Utc};
use den_core::{Catalog, Package, PackageKind, config::SiteConfig};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::{
    payload::to_script_json,
    template::{DetailSlot, IndexSlot, TemplateContext, TemplateError, TemplateRegistry},
};

/// Relative path from a detail page back to the site root.
pub const DETAIL_ROOT: &str = "../../";

/// HTML generation errors.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Page data could not be serialized.
    #[error("failed to serialize page data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for HTML generation.
pub type Result<T> = std::result::Result<T, HtmlError>;

/// A rendered page and its path relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub path: PathBuf,
    pub html: String,
}

/// HTML page generator.
#[derive(Debug)]
pub struct HtmlGenerator {
    templates: TemplateRegistry,
    site: SiteConfig,
    year: i32,
}

impl HtmlGenerator {
    /// Create a generator for `site`.
    ///
    /// The footer year is the configured copyright year, or the current year.
    #[must_use]
    pub fn new(site: SiteConfig, templates: TemplateRegistry) -> Self {
        let year = site.copyright_year.unwrap_or_else(|| Utc::now().year());
        Self {
            templates,
            site,
            year,
        }
    }

    /// Render the index and every detail page.
    ///
    /// Detail pages are rendered in parallel; the result keeps catalog order
    /// with the index first.
    pub fn render_site(&self, catalog: &Catalog) -> Result<Vec<RenderedPage>> {
        let data = to_script_json(catalog)?;

        let index = RenderedPage {
            path: PathBuf::from("index.html"),
            html: self.index_with_data(catalog, &data)?,
        };

        let packages: Vec<&Package> = catalog.iter().collect();
        let details = packages
            .par_iter()
            .map(|package| {
                Ok(RenderedPage {
                    path: PathBuf::from(package.page_path()),
                    html: self.detail_with_data(package, catalog, &data)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut pages = Vec::with_capacity(details.len() + 1);
        pages.push(index);
        pages.extend(details);
        Ok(pages)
    }

    /// Generate the index page.
    pub fn generate_index(&self, catalog: &Catalog) -> Result<String> {
        let data = to_script_json(catalog)?;
        self.index_with_data(catalog, &data)
    }

    /// Generate the detail page of `package`.
    pub fn generate_detail(&self, package: &Package, catalog: &Catalog) -> Result<String> {
        let data = to_script_json(catalog)?;
        self.detail_with_data(package, catalog, &data)
    }

    fn index_with_data(&self, catalog: &Catalog, data: &str) -> Result<String> {
        debug!(
            formulae = catalog.formulae.len(),
            casks = catalog.casks.len(),
            "generating index"
        );

        let ctx = IndexContext {
            title: escape_html(&self.site.title),
            description: escape_html(&self.site.description),
            tap: escape_html(&self.site.tap),
            formulae_count: catalog.formulae.len().to_string(),
            casks_count: catalog.casks.len().to_string(),
            formulae_cards: package_cards(&catalog.formulae, PackageKind::Formula),
            casks_cards: package_cards(&catalog.casks, PackageKind::Cask),
            footer: self.footer_html(),
            data: data.to_string(),
        };
        Ok(self.templates.render_index(&ctx)?)
    }

    fn detail_with_data(&self, package: &Package, catalog: &Catalog, data: &str) -> Result<String> {
        debug!(package = %package.name, "generating detail page");

        let ctx = DetailContext {
            root: DETAIL_ROOT.to_string(),
            site_title: escape_html(&self.site.title),
            name: escape_html(&package.name),
            description: escape_html(&package.desc),
            section_id: package.kind.section_id().to_string(),
            kind_label: package.kind.label().to_string(),
            version: escape_html(&package.version),
            stability: package.stability.to_string(),
            install_command: escape_html(&package.install_command(&self.site.tap)),
            details: details_html(package),
            caveats: caveats_html(&package.caveats),
            versions: versions_html(package),
            sidebar: sidebar_html(catalog, DETAIL_ROOT),
            sidebar_mobile: sidebar_mobile_html(catalog, DETAIL_ROOT),
            footer: self.footer_html(),
            formula: to_script_json(package)?,
            data: data.to_string(),
        };
        Ok(self.templates.render_detail(&ctx)?)
    }

    fn footer_html(&self) -> String {
        let repository = self
            .site
            .repository
            .as_deref()
            .map(|url| {
                format!(
                    r#"
            <p><a href="{}">Source on GitHub</a></p>"#,
                    escape_html(url)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<footer class="site-footer">
        <div class="container">
            <p>&copy; {} {}. Released under the {} License.</p>{}
        </div>
    </footer>"#,
            self.year,
            escape_html(&self.site.owner),
            escape_html(&self.site.license),
            repository
        )
    }
}

struct IndexContext {
    title: String,
    description: String,
    tap: String,
    formulae_count: String,
    casks_count: String,
    formulae_cards: String,
    casks_cards: String,
    footer: String,
    data: String,
}

impl TemplateContext for IndexContext {
    type Slot = IndexSlot;

    fn value(&self, slot: IndexSlot) -> &str {
        match slot {
            IndexSlot::Title => &self.title,
            IndexSlot::Description => &self.description,
            IndexSlot::Tap => &self.tap,
            IndexSlot::FormulaeCount => &self.formulae_count,
            IndexSlot::CasksCount => &self.casks_count,
            IndexSlot::FormulaeCards => &self.formulae_cards,
            IndexSlot::CasksCards => &self.casks_cards,
            IndexSlot::Footer => &self.footer,
            IndexSlot::Data => &self.data,
        }
    }
}

struct DetailContext {
    root: String,
    site_title: String,
    name: String,
    description: String,
    section_id: String,
    kind_label: String,
    version: String,
    stability: String,
    install_command: String,
    details: String,
    caveats: String,
    versions: String,
    sidebar: String,
    sidebar_mobile: String,
    footer: String,
    formula: String,
    data: String,
}

impl TemplateContext for DetailContext {
    type Slot = DetailSlot;

    fn value(&self, slot: DetailSlot) -> &str {
        match slot {
            DetailSlot::Root => &self.root,
            DetailSlot::SiteTitle => &self.site_title,
            DetailSlot::Name => &self.name,
            DetailSlot::Description => &self.description,
            DetailSlot::SectionId => &self.section_id,
            DetailSlot::KindLabel => &self.kind_label,
            DetailSlot::Version => &self.version,
            DetailSlot::Stability => &self.stability,
            DetailSlot::InstallCommand => &self.install_command,
            DetailSlot::Details => &self.details,
            DetailSlot::Caveats => &self.caveats,
            DetailSlot::Versions => &self.versions,
            DetailSlot::Sidebar => &self.sidebar,
            DetailSlot::SidebarMobile => &self.sidebar_mobile,
            DetailSlot::Footer => &self.footer,
            DetailSlot::Formula => &self.formula,
            DetailSlot::Data => &self.data,
        }
    }
}

/// Escape text for HTML element content and attribute values.
///
/// `{` is escaped too so that manifest text can never form a placeholder, and
/// `=` so that it can never spell a `const <name> = ` payload marker.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '=' => out.push_str("&#61;"),
            c => out.push(c),
        }
    }
    out
}

/// Cards for one family on the index page.
pub fn package_cards(packages: &[Package], kind: PackageKind) -> String {
    if packages.is_empty() {
        let label = match kind {
            PackageKind::Formula => "formulae",
            PackageKind::Cask => "casks",
        };
        return format!(r#"<p class="empty">No {label} in this tap yet.</p>"#);
    }

    packages
        .iter()
        .map(|p| {
            let name = escape_html(&p.name);
            format!(
                r#"<a class="package-card" href="formulae/{name}/" data-package="{name}">
                        <div class="package-card-header">
                            <h3>{name}</h3>
                            <span class="version">{}</span>
                            <span class="badge badge-{stability}">{stability}</span>
                        </div>
                        <p>{}</p>
                    </a>"#,
                escape_html(&p.version),
                escape_html(&p.desc),
                stability = p.stability,
            )
        })
        .collect::<Vec<_>>()
        .join("\n                    ")
}

fn details_html(package: &Package) -> String {
    let downloads = package
        .urls
        .iter()
        .map(|d| {
            format!(
                r#"<li><a href="{url}">{url}</a><br><code class="sha256">{}</code></li>"#,
                escape_html(&d.sha256),
                url = escape_html(&d.url),
            )
        })
        .collect::<Vec<_>>()
        .join("\n                        ");

    format!(
        r#"<dl class="details">
                    <dt>Type</dt><dd>{}</dd>
                    <dt>Version</dt><dd>{}</dd>
                    <dt>License</dt><dd>{}</dd>
                    <dt>Homepage</dt><dd><a href="{homepage}">{homepage}</a></dd>
                    <dt>Downloads</dt>
                    <dd><ul class="downloads">
                        {downloads}
                    </ul></dd>
                </dl>"#,
        package.kind.label(),
        escape_html(&package.version),
        escape_html(&package.license),
        homepage = escape_html(&package.homepage),
    )
}

fn caveats_html(caveats: &str) -> String {
    if caveats.trim().is_empty() {
        return r#"<p class="empty">No caveats for this package.</p>"#.to_string();
    }
    format!(r#"<pre class="caveats">{}</pre>"#, escape_html(caveats))
}

fn versions_html(package: &Package) -> String {
    if package.versions.is_empty() {
        return r#"<p class="empty">No release history available.</p>"#.to_string();
    }

    let rows = package
        .versions
        .iter()
        .map(|v| {
            let current = if v.version == package.version {
                r#" class="current""#
            } else {
                ""
            };
            format!(
                r#"<tr{current}><td><a href="{}">{}</a></td><td><time datetime="{date}">{date}</time></td></tr>"#,
                escape_html(&v.url),
                escape_html(&v.version),
                date = escape_html(&v.date),
            )
        })
        .collect::<Vec<_>>()
        .join("\n                        ");

    format!(
        r#"<table class="versions">
                    <thead><tr><th>Version</th><th>Released</th></tr></thead>
                    <tbody>
                        {rows}
                    </tbody>
                </table>"#
    )
}

fn sidebar_links(packages: &[Package], root: &str) -> String {
    packages
        .iter()
        .map(|p| {
            let name = escape_html(&p.name);
            format!(r#"<li><a href="{root}formulae/{name}/" data-package="{name}">{name}</a></li>"#)
        })
        .collect::<Vec<_>>()
        .join("\n                    ")
}

/// Desktop sidebar listing every package.
pub fn sidebar_html(catalog: &Catalog, root: &str) -> String {
    let mut groups = Vec::new();
    for (label, packages) in [("Formulae", &catalog.formulae), ("Casks", &catalog.casks)] {
        if packages.is_empty() {
            continue;
        }
        groups.push(format!(
            r#"<h2>{label}</h2>
                <ul>
                    {}
                </ul>"#,
            sidebar_links(packages, root)
        ));
    }

    format!(
        r#"<nav class="sidebar-nav" aria-label="Packages">
                {}
            </nav>"#,
        groups.join("\n                ")
    )
}

/// Horizontal package strip shown on small screens.
pub fn sidebar_mobile_html(catalog: &Catalog, root: &str) -> String {
    let links = catalog
        .iter()
        .map(|p| {
            let name = escape_html(&p.name);
            format!(r#"<a href="{root}formulae/{name}/" data-package="{name}">{name}</a>"#)
        })
        .collect::<Vec<_>>()
        .join("\n        ");

    format!(
        r#"<nav id="sidebar-mobile" class="sidebar-mobile" aria-label="Packages">
        {links}
    </nav>"#
    )
}

#[cfg(test)]
mod tests {
    use den_core::{Download, Stability, VersionRecord};

    use super::*;
    use crate::payload::extract;

    fn site() -> SiteConfig {
        SiteConfig {
            copyright_year: Some(2026),
            ..SiteConfig::default()
        }
    }

    fn generator() -> HtmlGenerator {
        HtmlGenerator::new(site(), TemplateRegistry::new().unwrap())
    }

    fn package(name: &str, kind: PackageKind) -> Package {
        Package {
            name: name.to_string(),
            kind,
            desc: "Cross-platform app icon generator".to_string(),
            homepage: format!("https://github.com/MrDemonWolf/{name}"),
            version: "0.0.6".to_string(),
            license: "MIT".to_string(),
            stability: Stability::Alpha,
            caveats: String::new(),
            urls: vec![Download {
                url: format!("https://example.com/{name}.tar.gz"),
                sha256: "a".repeat(64),
            }],
            versions: vec![],
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_packages([
            package("iconwolf", PackageKind::Formula),
            package("wolfdesk", PackageKind::Cask),
        ])
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("<tag>"), "&lt;tag&gt;");
        assert_eq!(escape_html("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(escape_html("{{ TITLE }}"), "&#123;&#123; TITLE }}");
        assert_eq!(escape_html("const data = 1"), "const data &#61; 1");
    }

    #[test]
    fn test_generate_index() {
        let html = generator().generate_index(&catalog()).unwrap();

        assert!(html.contains("<title>Homebrew Den</title>"));
        assert!(html.contains(r#"<code id="tap-command">brew tap mrdemonwolf/den</code>"#));
        assert!(html.contains(r#"id="formulae-section""#));
        assert!(html.contains(r#"id="casks-section""#));
        assert!(html.contains(r#"id="search-overlay""#));
        assert!(html.contains(r#"id="theme-toggle""#));
        assert!(html.contains(r#"href="output.css""#));
        assert!(html.contains(r#"href="favicon.svg""#));
        assert!(html.contains("&copy; 2026 MrDemonWolf"));
        assert!(html.contains("MIT License"));
        assert!(html.contains(r#"href="formulae/iconwolf/""#));

        let data: Catalog = extract(&html, "data").unwrap();
        assert_eq!(data, catalog());
    }

    #[test]
    fn test_generate_detail() {
        let catalog = catalog();
        let pkg = &catalog.formulae[0];
        let html = generator().generate_detail(pkg, &catalog).unwrap();

        assert!(html.contains("<title>iconwolf | Homebrew Den</title>"));
        assert!(html.contains(r#"<span id="breadcrumb-name">iconwolf</span>"#));
        assert!(html.contains(r#"href="../../#formulae-section""#));
        assert!(html.contains(r#"href="../../output.css""#));
        assert!(html.contains(r#"href="../../favicon.svg""#));
        assert!(html.contains("brew install mrdemonwolf/den/iconwolf"));
        assert!(html.contains(r#"id="caveats-section""#));
        assert!(html.contains("No caveats for this package."));
        assert!(html.contains("No release history available."));
        assert!(html.contains(r#"<nav id="sidebar-mobile""#));
        assert!(html.contains(r#"<aside class="sidebar">"#));

        let formula: Package = extract(&html, "formula").unwrap();
        assert_eq!(&formula, pkg);
        let data: Catalog = extract(&html, "data").unwrap();
        assert_eq!(data, catalog);
    }

    #[test]
    fn test_cask_breadcrumb_and_install() {
        let catalog = catalog();
        let html = generator()
            .generate_detail(&catalog.casks[0], &catalog)
            .unwrap();
        assert!(html.contains(r#"href="../../#casks-section""#));
        assert!(html.contains("brew install --cask mrdemonwolf/den/wolfdesk"));
    }

    #[test]
    fn test_hostile_manifest_text() {
        let mut pkg = package("iconwolf", PackageKind::Formula);
        pkg.desc = "</script>{{ DATA }}".to_string();
        pkg.caveats = "Run {{ ROOT }} & <b>".to_string();
        let catalog = Catalog::from_packages([pkg.clone()]);

        let html = generator().generate_detail(&pkg, &catalog).unwrap();
        assert!(!html.contains("{{"));
        assert!(html.contains("Run &#123;&#123; ROOT }} &amp; &lt;b&gt;"));

        let formula: Package = extract(&html, "formula").unwrap();
        assert_eq!(formula, pkg);

        pkg.caveats = "const data = {};\n export PATH=\"${HOME}\";".to_string();
        let catalog = Catalog::from_packages([pkg.clone()]);
        let html = generator().generate_detail(&pkg, &catalog).unwrap();
        assert_eq!(html.matches("const data = ").count(), 1);
        assert_eq!(html.matches("const formula = ").count(), 1);
        let formula: Package = extract(&html, "formula").unwrap();
        assert_eq!(formula, pkg);
        let data: Catalog = extract(&html, "data").unwrap();
        assert_eq!(data, catalog);
    }

    #[test]
    fn test_versions_table() {
        let mut pkg = package("iconwolf", PackageKind::Formula);
        pkg.versions = vec![
            VersionRecord {
                version: "0.0.6".to_string(),
                tag: "v0.0.6".to_string(),
                date: "2026-02-01".to_string(),
                url: "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.6".to_string(),
            },
            VersionRecord {
                version: "0.0.5".to_string(),
                tag: "v0.0.5".to_string(),
                date: "2026-01-10".to_string(),
                url: "https://github.com/MrDemonWolf/iconwolf/releases/tag/v0.0.5".to_string(),
            },
        ];

        let html = versions_html(&pkg);
        assert!(html.contains(r#"<tr class="current">"#));
        assert!(html.contains("2026-01-10"));
        assert_eq!(html.matches("<tr").count(), 3);
    }

    #[test]
    fn test_caveats_preformatted() {
        let html = caveats_html("Usage:\n  iconwolf <input>");
        assert_eq!(
            html,
            "<pre class=\"caveats\">Usage:\n  iconwolf &lt;input&gt;</pre>"
        );
    }

    #[test]
    fn test_empty_family_placeholder() {
        assert!(package_cards(&[], PackageKind::Cask).contains("No casks"));
    }

    #[test]
    fn test_render_site_order() {
        let catalog = Catalog::from_packages([
            package("zeta", PackageKind::Formula),
            package("alpha", PackageKind::Formula),
            package("wolfdesk", PackageKind::Cask),
        ]);
        let pages = generator().render_site(&catalog).unwrap();
        let paths: Vec<_> = pages.iter().map(|p| p.path.to_string_lossy().into_owned()).collect();
        assert_eq!(
            paths,
            [
                "index.html",
                "formulae/alpha/index.html",
                "formulae/zeta/index.html",
                "formulae/wolfdesk/index.html",
            ]
        );
    }
}
