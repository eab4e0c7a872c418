//! HTML template system for page generation.
//!
//! Templates use `{{ NAME }}` placeholders. Each page family has a closed set
//! of slots; a template is parsed once into literal and slot segments, so an
//! unknown placeholder is rejected when the template is loaded rather than
//! when a page is rendered. Rendering asks a typed [`TemplateContext`] for the
//! value of every slot.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

static LEFTOVER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*[A-Za-z_][A-Za-z0-9_]*\s*\}\}").expect("valid token regex")
});

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Placeholder that the template family does not define.
    #[error("template `{template}`: unknown placeholder `{name}`")]
    UnknownPlaceholder { template: String, name: String },

    /// Invalid template syntax.
    #[error("template `{template}`: invalid syntax: {message}")]
    InvalidSyntax { template: String, message: String },

    /// A placeholder token survived rendering.
    #[error("template `{template}`: unresolved placeholder `{token}` in output")]
    Unresolved { template: String, token: String },

    /// Template override could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Page families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Index,
    FormulaDetail,
}

impl TemplateId {
    /// Identifier used in messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::FormulaDetail => "formula-detail",
        }
    }

    /// File name of an override in a templates directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Index => "index.html",
            Self::FormulaDetail => "formula.html",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placeholder name known to a template family.
pub trait Slot: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every slot of the family.
    const ALL: &'static [Self];

    /// Name as written between the braces.
    fn name(self) -> &'static str;

    /// Look a slot up by name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.name() == name)
    }
}

/// Supplies a value for every slot of one family.
pub trait TemplateContext {
    type Slot: Slot;

    /// Rendered text for `slot`. Values are inserted verbatim.
    fn value(&self, slot: Self::Slot) -> &str;
}

macro_rules! slots {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)+
        }

        impl Slot for $name {
            const ALL: &'static [Self] = &[$(Self::$variant,)+];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }
    };
}

slots! {
    /// Placeholders of the index page.
    pub enum IndexSlot {
        Title => "TITLE",
        Description => "DESCRIPTION",
        Tap => "TAP",
        FormulaeCount => "FORMULAE_COUNT",
        CasksCount => "CASKS_COUNT",
        FormulaeCards => "FORMULAE_CARDS",
        CasksCards => "CASKS_CARDS",
        Footer => "FOOTER",
        Data => "DATA",
    }
}

slots! {
    /// Placeholders of a package detail page.
    pub enum DetailSlot {
        Root => "ROOT",
        SiteTitle => "SITE_TITLE",
        Name => "NAME",
        Description => "DESCRIPTION",
        SectionId => "SECTION_ID",
        KindLabel => "KIND_LABEL",
        Version => "VERSION",
        Stability => "STABILITY",
        InstallCommand => "INSTALL_COMMAND",
        Details => "DETAILS",
        Caveats => "CAVEATS",
        Versions => "VERSIONS",
        Sidebar => "SIDEBAR",
        SidebarMobile => "SIDEBAR_MOBILE",
        Footer => "FOOTER",
        Formula => "FORMULA",
        Data => "DATA",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<S> {
    Literal(String),
    Slot(S),
}

/// A parsed template of one family.
#[derive(Debug, Clone)]
pub struct Template<S: Slot> {
    id: TemplateId,
    segments: Vec<Segment<S>>,
}

impl<S: Slot> Template<S> {
    /// Parse template source.
    ///
    /// Fails on an unclosed `{{` or a placeholder outside the slot set.
    pub fn parse(id: TemplateId, source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| TemplateError::InvalidSyntax {
                template: id.to_string(),
                message: format!(
                    "unclosed {{{{ delimiter at byte {}",
                    source.len() - rest.len() + start
                ),
            })?;

            let name = after[..end].trim();
            let slot = S::from_name(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                template: id.to_string(),
                name: name.to_string(),
            })?;
            segments.push(Segment::Slot(slot));
            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { id, segments })
    }

    /// Slots referenced by the template, in order of appearance.
    #[cfg(test)]
    fn slots(&self) -> impl Iterator<Item = S> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    /// Render with `context`, then verify no placeholder token remains.
    pub fn render<C>(&self, context: &C) -> Result<String>
    where
        C: TemplateContext<Slot = S>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(context.value(*slot)),
            }
        }

        check_unresolved(self.id, &out)?;
        Ok(out)
    }
}

/// Fail if `html` still contains a `{{ IDENT }}` token.
pub fn check_unresolved(id: TemplateId, html: &str) -> Result<()> {
    match LEFTOVER_TOKEN.find(html) {
        Some(token) => Err(TemplateError::Unresolved {
            template: id.to_string(),
            token: token.as_str().to_string(),
        }),
        None => Ok(()),
    }
}

/// The templates used for a build.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    index: Template<IndexSlot>,
    detail: Template<DetailSlot>,
}

impl TemplateRegistry {
    /// Create a registry with the built-in templates.
    pub fn new() -> Result<Self> {
        Ok(Self {
            index: Template::parse(TemplateId::Index, DEFAULT_INDEX_TEMPLATE)?,
            detail: Template::parse(TemplateId::FormulaDetail, DEFAULT_DETAIL_TEMPLATE)?,
        })
    }

    /// Built-in templates, replaced by `index.html` / `formula.html` from
    /// `dir` where present.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new()?;

        if let Some(source) = read_override(dir, TemplateId::Index)? {
            registry.index = Template::parse(TemplateId::Index, &source)?;
        }
        if let Some(source) = read_override(dir, TemplateId::FormulaDetail)? {
            registry.detail = Template::parse(TemplateId::FormulaDetail, &source)?;
        }

        Ok(registry)
    }

    /// Render the index page.
    pub fn render_index<C>(&self, context: &C) -> Result<String>
    where
        C: TemplateContext<Slot = IndexSlot>,
    {
        self.index.render(context)
    }

    /// Render a package detail page.
    pub fn render_detail<C>(&self, context: &C) -> Result<String>
    where
        C: TemplateContext<Slot = DetailSlot>,
    {
        self.detail.render(context)
    }
}

fn read_override(dir: &Path, id: TemplateId) -> Result<Option<String>> {
    let path = dir.join(id.file_name());
    if !path.is_file() {
        return Ok(None);
    }
    debug!(template = %id, path = %path.display(), "loading template override");
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|source| TemplateError::Io { path, source })
}

/// Default index template.
pub const DEFAULT_INDEX_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en" class="scroll-smooth">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ TITLE }}</title>
    <meta name="description" content="{{ DESCRIPTION }}">
    <link rel="icon" type="image/svg+xml" href="favicon.svg">
    <link rel="stylesheet" href="output.css">
</head>
<body>
    <header class="site-header">
        <div class="container">
            <nav aria-label="Primary">
                <a href="./" class="site-title">{{ TITLE }}</a>
                <div class="nav-links">
                    <a href="#formulae-section">Formulae</a>
                    <a href="#casks-section">Casks</a>
                    <button id="search-open" class="search-button" type="button" aria-controls="search-overlay">Search</button>
                    <button id="theme-toggle" class="theme-toggle" aria-label="Toggle theme" type="button">
                    <svg class="icon-sun" xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="currentColor" stroke-width="2">
                        <path stroke-linecap="round" stroke-linejoin="round" d="M12 3v1m0 16v1m9-9h-1M4 12H3m15.364 6.364l-.707-.707M6.343 6.343l-.707-.707m12.728 0l-.707.707M6.343 17.657l-.707.707M16 12a4 4 0 11-8 0 4 4 0 018 0z" />
                    </svg>
                    <svg class="icon-moon" xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="currentColor" stroke-width="2">
                        <path stroke-linecap="round" stroke-linejoin="round" d="M20.354 15.354A9 9 0 018.646 3.646 9.003 9.003 0 0012 21a9.003 9.003 0 008.354-5.646z" />
                    </svg>
                </button>
                </div>
            </nav>
        </div>
    </header>
    <main>
        <section class="hero">
            <div class="container">
                <h1>{{ TITLE }}</h1>
                <p class="hero-description">{{ DESCRIPTION }}</p>
                <div class="tap-box">
                    <code id="tap-command">brew tap {{ TAP }}</code>
                    <button class="copy-button" type="button" data-copy-target="tap-command">Copy</button>
                </div>
            </div>
        </section>
        <section id="formulae-section" class="package-section">
            <div class="container">
                <h2>Formulae <span class="count">{{ FORMULAE_COUNT }}</span></h2>
                <div class="package-grid">
                    {{ FORMULAE_CARDS }}
                </div>
            </div>
        </section>
        <section id="casks-section" class="package-section">
            <div class="container">
                <h2>Casks <span class="count">{{ CASKS_COUNT }}</span></h2>
                <div class="package-grid">
                    {{ CASKS_CARDS }}
                </div>
            </div>
        </section>
    </main>
    <div id="search-overlay" class="search-overlay" hidden>
        <div class="search-panel" role="dialog" aria-label="Search packages">
            <input id="search-input" type="search" placeholder="Search formulae and casks" autocomplete="off">
            <ul id="search-results" class="search-results"></ul>
        </div>
    </div>
    {{ FOOTER }}
    <script>
        (function() {
            const toggle = document.getElementById('theme-toggle');
            const html = document.documentElement;

            function getTheme() {
                const saved = localStorage.getItem('theme');
                if (saved) return saved;
                return window.matchMedia('(prefers-color-scheme: dark)').matches ? 'dark' : 'light';
            }

            function setTheme(theme) {
                html.setAttribute('data-theme', theme);
                localStorage.setItem('theme', theme);
            }

            setTheme(getTheme());

            toggle.addEventListener('click', () => {
                const current = html.getAttribute('data-theme') || getTheme();
                setTheme(current === 'dark' ? 'light' : 'dark');
            });
        })();
    </script>
    <script>
        const data = {{ DATA }};
        (function() {
            const overlay = document.getElementById('search-overlay');
            const input = document.getElementById('search-input');
            const results = document.getElementById('search-results');
            const packages = data.formulae.concat(data.casks);

            function open() {
                overlay.hidden = false;
                input.value = '';
                show('');
                input.focus();
            }

            function close() {
                overlay.hidden = true;
            }

            function show(query) {
                const q = query.trim().toLowerCase();
                results.replaceChildren();
                packages
                    .filter((p) => !q || p.name.toLowerCase().includes(q) || p.desc.toLowerCase().includes(q))
                    .forEach((p) => {
                        const item = document.createElement('li');
                        const link = document.createElement('a');
                        link.href = 'formulae/' + encodeURIComponent(p.name) + '/';
                        link.textContent = p.name + ' ' + p.version;
                        item.appendChild(link);
                        results.appendChild(item);
                    });
            }

            document.getElementById('search-open').addEventListener('click', open);
            input.addEventListener('input', () => show(input.value));
            overlay.addEventListener('click', (e) => {
                if (e.target === overlay) close();
            });
            document.addEventListener('keydown', (e) => {
                if (e.key === '/' && overlay.hidden && document.activeElement !== input) {
                    e.preventDefault();
                    open();
                } else if (e.key === 'Escape') {
                    close();
                }
            });

            document.querySelectorAll('[data-copy-target]').forEach((button) => {
                button.addEventListener('click', () => {
                    const target = document.getElementById(button.dataset.copyTarget);
                    navigator.clipboard.writeText(target.textContent);
                });
            });
        })();
    </script>
</body>
</html>
"##;

/// Default package detail template.
pub const DEFAULT_DETAIL_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en" class="scroll-smooth">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ NAME }} | {{ SITE_TITLE }}</title>
    <meta name="description" content="{{ DESCRIPTION }}">
    <link rel="icon" type="image/svg+xml" href="{{ ROOT }}favicon.svg">
    <link rel="stylesheet" href="{{ ROOT }}output.css">
</head>
<body>
    <header class="site-header">
        <div class="container">
            <nav aria-label="Primary">
                <a href="{{ ROOT }}" class="site-title">{{ SITE_TITLE }}</a>
                <div class="nav-links">
                    <a href="{{ ROOT }}#formulae-section">Formulae</a>
                    <a href="{{ ROOT }}#casks-section">Casks</a>
                    <button id="theme-toggle" class="theme-toggle" aria-label="Toggle theme" type="button">
                    <svg class="icon-sun" xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="currentColor" stroke-width="2">
                        <path stroke-linecap="round" stroke-linejoin="round" d="M12 3v1m0 16v1m9-9h-1M4 12H3m15.364 6.364l-.707-.707M6.343 6.343l-.707-.707m12.728 0l-.707.707M6.343 17.657l-.707.707M16 12a4 4 0 11-8 0 4 4 0 018 0z" />
                    </svg>
                    <svg class="icon-moon" xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="currentColor" stroke-width="2">
                        <path stroke-linecap="round" stroke-linejoin="round" d="M20.354 15.354A9 9 0 018.646 3.646 9.003 9.003 0 0012 21a9.003 9.003 0 008.354-5.646z" />
                    </svg>
                </button>
                </div>
            </nav>
        </div>
    </header>
    {{ SIDEBAR_MOBILE }}
    <div class="container layout">
        <aside class="sidebar">
            {{ SIDEBAR }}
        </aside>
        <main>
            <nav id="breadcrumb" class="breadcrumb" aria-label="Breadcrumb">
                <a href="{{ ROOT }}">Home</a>
                <span class="separator">/</span>
                <a href="{{ ROOT }}#{{ SECTION_ID }}">{{ KIND_LABEL }}</a>
                <span class="separator">/</span>
                <span id="breadcrumb-name">{{ NAME }}</span>
            </nav>
            <header class="package-header">
                <h1>{{ NAME }}</h1>
                <span class="version">{{ VERSION }}</span>
                <span class="badge badge-{{ STABILITY }}">{{ STABILITY }}</span>
                <p class="package-desc">{{ DESCRIPTION }}</p>
            </header>
            <section id="install-section" class="detail-section">
                <h2>Install</h2>
                <div class="command-box">
                    <code id="install-command">{{ INSTALL_COMMAND }}</code>
                    <button class="copy-button" type="button" data-copy-target="install-command">Copy</button>
                </div>
            </section>
            <section id="details-section" class="detail-section">
                <h2>Details</h2>
                {{ DETAILS }}
            </section>
            <section id="caveats-section" class="detail-section">
                <h2>Caveats</h2>
                {{ CAVEATS }}
            </section>
            <section id="versions-section" class="detail-section">
                <h2>Versions</h2>
                {{ VERSIONS }}
            </section>
        </main>
    </div>
    {{ FOOTER }}
    <script>
        (function() {
            const toggle = document.getElementById('theme-toggle');
            const html = document.documentElement;

            function getTheme() {
                const saved = localStorage.getItem('theme');
                if (saved) return saved;
                return window.matchMedia('(prefers-color-scheme: dark)').matches ? 'dark' : 'light';
            }

            function setTheme(theme) {
                html.setAttribute('data-theme', theme);
                localStorage.setItem('theme', theme);
            }

            setTheme(getTheme());

            toggle.addEventListener('click', () => {
                const current = html.getAttribute('data-theme') || getTheme();
                setTheme(current === 'dark' ? 'light' : 'dark');
            });
        })();
    </script>
    <script>
        const formula = {{ FORMULA }};
        const data = {{ DATA }};
        (function() {
            document.querySelectorAll('[data-copy-target]').forEach((button) => {
                button.addEventListener('click', () => {
                    const target = document.getElementById(button.dataset.copyTarget);
                    navigator.clipboard.writeText(target.textContent);
                });
            });
            const current = document.querySelector('[data-package="' + formula.name + '"]');
            if (current) current.setAttribute('aria-current', 'page');
        })();
    </script>
</body>
</html>
"##;
