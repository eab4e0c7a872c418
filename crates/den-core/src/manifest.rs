//! Package manifest parsing.
//!
//! Manifests are Homebrew formula (`class Foo < Formula`) and cask
//! (`cask "foo" do`) files. A line scanner collects the fields this site needs
//! into a [`ManifestIr`], and [`ManifestIr::validate`] is the single place where
//! required fields, formats and the header/name match are enforced.
//!
//! Blocks the catalog does not describe (`bottle`, `resource`, `livecheck`,
//! `patch`, `head`, method bodies) are skipped so that their `url`/`sha256`
//! lines are not mistaken for the package's own downloads.

use std::{path::Path, str::Lines, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::{
    package::{Download, Package, PackageKind},
    stability::classify,
};

/// Maximum length of a `desc` line.
pub const MAX_DESC_LEN: usize = 80;

static FORMULA_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^class\s+([A-Za-z0-9_]+)\s*<\s*Formula\b").expect("valid header regex")
});

static CASK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^cask\s+["']([^"']+)["']\s+do\b"#).expect("valid header regex")
});

static VERSION_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+").expect("valid version regex"));

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9._+@-]*$").expect("valid name regex"));

static KEYWORD_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b([a-z_]+):\s*["']([^"']*)["']"#).expect("valid keyword regex")
});

static BLOCK_PARAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdo\s*\|[^|]*\|$").expect("valid block regex"));

/// Blocks whose contents never describe the package itself.
const SKIPPED_BLOCKS: &[&str] = &["bottle", "resource", "livecheck", "patch", "head"];

/// Manifest validation errors. Any of these stops the build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// File name is not a valid package name.
    #[error("invalid package name `{name}`")]
    InvalidName { name: String },

    /// No `class … < Formula` / `cask "…" do` header.
    #[error("manifest `{name}`: missing header, expected `{expected}`")]
    MissingHeader { name: String, expected: String },

    /// Header declares a different identifier than the file name.
    #[error("manifest `{name}`: header declares `{found}`, expected `{expected}`")]
    HeaderMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// Required field absent.
    #[error("manifest `{name}`: missing required field `{field}`")]
    MissingField { name: String, field: &'static str },

    /// Field present but malformed.
    #[error("manifest `{name}`: invalid `{field}`: {reason}")]
    InvalidField {
        name: String,
        field: &'static str,
        reason: String,
    },

    /// No download declared at all.
    #[error("manifest `{name}`: no `url` declared (at least one download is required)")]
    MissingUrl { name: String },

    /// A download has no checksum.
    #[error("manifest `{name}`: missing `sha256` checksum for {url}")]
    MissingChecksum { name: String, url: String },
}

impl ManifestError {
    /// Name of the package the error refers to.
    #[must_use]
    pub fn package(&self) -> &str {
        match self {
            Self::InvalidName { name }
            | Self::MissingHeader { name, .. }
            | Self::HeaderMismatch { name, .. }
            | Self::MissingField { name, .. }
            | Self::InvalidField { name, .. }
            | Self::MissingUrl { name }
            | Self::MissingChecksum { name, .. } => name,
        }
    }
}

type Result<T> = std::result::Result<T, ManifestError>;

/// One `sha256` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    /// `sha256 "<hex>"` or a bare symbol such as `:no_check`.
    Single(String),
    /// `sha256 arm: "<hex>", intel: "<hex>"`, in declaration order.
    PerArch(Vec<(String, String)>),
}

/// Raw fields scanned from a manifest, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestIr {
    /// Identifier declared by the header line.
    pub header: Option<String>,
    pub desc: Option<String>,
    pub homepage: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    /// Download URLs in declaration order.
    pub urls: Vec<String>,
    /// Checksum stanzas in declaration order.
    pub checksums: Vec<Checksum>,
    /// `arch arm: "arm64", intel: "x86_64"` values for `#{arch}`.
    pub arch: Vec<(String, String)>,
    pub caveats: Option<String>,
    /// Whether a `test do` block is present.
    pub has_test: bool,
}

impl ManifestIr {
    /// Scan manifest source into raw fields.
    #[must_use]
    pub fn scan(source: &str, kind: PackageKind) -> Self {
        let mut ir = Self::default();
        let mut lines = source.lines();

        while let Some(line) = lines.next() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if ir.header.is_none() {
                if let Some(ident) = header_ident(line, kind) {
                    ir.header = Some(ident);
                    continue;
                }
            }

            if line == "def caveats" {
                ir.caveats = Some(read_caveats_method(&mut lines));
                continue;
            }

            if line.starts_with("def ") {
                skip_block(&mut lines);
                continue;
            }

            let (key, rest) = split_key(line);

            if key == "test" && is_do_block(rest) {
                ir.has_test = true;
                skip_block(&mut lines);
                continue;
            }

            if SKIPPED_BLOCKS.contains(&key.as_str()) && opens_block(line) {
                skip_block(&mut lines);
                continue;
            }

            match key.as_str() {
                "desc" => set_once(&mut ir.desc, string_literal(rest)),
                "homepage" => set_once(&mut ir.homepage, string_literal(rest)),
                "version" => set_once(&mut ir.version, string_literal(rest)),
                "license" => set_once(&mut ir.license, string_literal(rest)),
                "url" => {
                    if let Some(url) = string_literal(rest) {
                        ir.urls.push(url);
                    }
                }
                "sha256" => {
                    let rest = continued(rest, &mut lines);
                    let rest = rest.as_str();
                    let per_arch = keyword_literals(rest);
                    let checksum = if rest.starts_with(['"', '\'']) || per_arch.is_empty() {
                        string_literal(rest).or_else(|| symbol(rest)).map(Checksum::Single)
                    } else {
                        Some(Checksum::PerArch(per_arch))
                    };
                    ir.checksums.extend(checksum);
                }
                "arch" if ir.arch.is_empty() => {
                    ir.arch = keyword_literals(&continued(rest, &mut lines));
                }
                "caveats" => {
                    let text = match heredoc_terminator(rest) {
                        Some((terminator, squiggly)) => {
                            Some(read_heredoc(&mut lines, &terminator, squiggly))
                        }
                        None => string_literal(rest),
                    };
                    set_once(&mut ir.caveats, text);
                }
                _ => {}
            }
        }

        ir
    }

    /// Check every field and build a [`Package`].
    ///
    /// `name` is the file-derived package name.
    pub fn validate(self, name: &str, kind: PackageKind) -> Result<Package> {
        let name = name.to_lowercase();
        if !PACKAGE_NAME.is_match(&name) {
            return Err(ManifestError::InvalidName { name });
        }

        let expected = expected_header(&name, kind);
        match &self.header {
            None => {
                return Err(ManifestError::MissingHeader {
                    name,
                    expected: match kind {
                        PackageKind::Formula => format!("class {expected} < Formula"),
                        PackageKind::Cask => format!("cask \"{expected}\" do"),
                    },
                });
            }
            Some(found) if *found != expected => {
                return Err(ManifestError::HeaderMismatch {
                    name,
                    expected,
                    found: found.clone(),
                });
            }
            Some(_) => {}
        }

        let desc = required(&name, "desc", self.desc)?;
        let desc_len = desc.chars().count();
        if desc_len == 0 || desc_len > MAX_DESC_LEN {
            return Err(invalid(
                &name,
                "desc",
                format!("must be 1-{MAX_DESC_LEN} characters, got {desc_len}"),
            ));
        }

        let homepage = required(&name, "homepage", self.homepage)?;
        if !homepage.starts_with("https://") {
            return Err(invalid(&name, "homepage", "must start with https://"));
        }

        let version = required(&name, "version", self.version)?;
        if !VERSION_SHAPE.is_match(&version) {
            return Err(invalid(
                &name,
                "version",
                format!("`{version}` does not start with <major>.<minor>"),
            ));
        }

        let license = required(&name, "license", self.license)?;
        if license.trim().is_empty() {
            return Err(invalid(&name, "license", "must not be empty"));
        }

        let urls = pair_downloads(&name, &version, &self.arch, self.urls, self.checksums)?;

        if kind == PackageKind::Formula && !self.has_test {
            return Err(ManifestError::MissingField {
                name,
                field: "test",
            });
        }

        Ok(Package {
            stability: classify(&version, false),
            name,
            kind,
            desc,
            homepage,
            version,
            license,
            caveats: self.caveats.unwrap_or_default(),
            urls,
            versions: Vec::new(),
        })
    }
}

/// Parse manifest source for the file-derived `name`.
pub fn parse_manifest(source: &str, name: &str, kind: PackageKind) -> Result<Package> {
    ManifestIr::scan(source, kind).validate(name, kind)
}

/// File-derived package name: the lower-cased stem of a `.rb` file.
#[must_use]
pub fn manifest_name(path: &Path) -> Option<String> {
    if path.extension().is_none_or(|ext| ext != "rb") {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_lowercase)
}

/// Whether `path` looks like a manifest file.
#[must_use]
pub fn is_manifest(path: &Path) -> bool {
    manifest_name(path).is_some()
}

/// Homebrew class name for a formula name: `foo-bar@2` → `FooBarAT2`.
#[must_use]
pub fn class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        match c {
            '-' | '_' | '.' => upper = true,
            '+' => {
                out.push('x');
                upper = false;
            }
            '@' => {
                out.push_str("AT");
                upper = false;
            }
            c if upper => {
                out.extend(c.to_uppercase());
                upper = false;
            }
            c => out.push(c),
        }
    }
    out
}

/// Resolve `#{version}` interpolation.
fn interpolate(value: &str, version: &str) -> String {
    value.replace("#{version}", version)
}

fn expected_header(name: &str, kind: PackageKind) -> String {
    match kind {
        PackageKind::Formula => class_name(name),
        PackageKind::Cask => name.to_string(),
    }
}

fn pair_downloads(
    name: &str,
    version: &str,
    arch: &[(String, String)],
    urls: Vec<String>,
    checksums: Vec<Checksum>,
) -> Result<Vec<Download>> {
    if urls.is_empty() {
        return Err(ManifestError::MissingUrl {
            name: name.to_string(),
        });
    }
    if checksums.len() > urls.len() {
        return Err(invalid(name, "sha256", "declared without a matching url"));
    }

    let mut checksums = checksums.into_iter();
    let mut downloads = Vec::with_capacity(urls.len());
    for url in urls {
        let url = interpolate(&url, version);
        let per_arch = url.contains("#{arch}");
        match checksums.next() {
            None => {
                return Err(ManifestError::MissingChecksum {
                    name: name.to_string(),
                    url,
                });
            }
            Some(Checksum::Single(_)) if per_arch => {
                return Err(invalid(
                    name,
                    "sha256",
                    "a url using `#{arch}` needs one checksum per architecture",
                ));
            }
            Some(Checksum::Single(sha256)) => {
                downloads.push(Download {
                    url,
                    sha256: check_digest(name, sha256)?,
                });
            }
            Some(Checksum::PerArch(_)) if !per_arch => {
                return Err(invalid(
                    name,
                    "sha256",
                    "per-architecture checksums need a url using `#{arch}`",
                ));
            }
            Some(Checksum::PerArch(sums)) => {
                for (key, sha256) in sums {
                    let Some((_, value)) = arch.iter().find(|(k, _)| *k == key) else {
                        return Err(invalid(
                            name,
                            "arch",
                            format!("no `{key}:` value to substitute for `#{{arch}}`"),
                        ));
                    };
                    downloads.push(Download {
                        url: url.replace("#{arch}", value),
                        sha256: check_digest(name, sha256)?,
                    });
                }
            }
        }
    }
    Ok(downloads)
}

fn check_digest(name: &str, sha256: String) -> Result<String> {
    if sha256.len() != 64 || !sha256.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(
            name,
            "sha256",
            format!("`{sha256}` is not a 64 character hex digest"),
        ));
    }
    Ok(sha256)
}

fn required(name: &str, field: &'static str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| ManifestError::MissingField {
        name: name.to_string(),
        field,
    })
}

fn invalid(name: &str, field: &'static str, reason: impl Into<String>) -> ManifestError {
    ManifestError::InvalidField {
        name: name.to_string(),
        field,
        reason: reason.into(),
    }
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn header_ident(line: &str, kind: PackageKind) -> Option<String> {
    let re = match kind {
        PackageKind::Formula => &FORMULA_HEADER,
        PackageKind::Cask => &CASK_HEADER,
    };
    re.captures(line).map(|caps| caps[1].to_string())
}

/// Split `key rest…` on the first non-identifier character.
fn split_key(line: &str) -> (String, &str) {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    (line[..end].to_ascii_lowercase(), line[end..].trim_start())
}

fn is_do_block(rest: &str) -> bool {
    rest == "do" || rest.starts_with("do ") || rest.starts_with("do|")
}

fn opens_block(line: &str) -> bool {
    line.ends_with(" do") || line == "do" || BLOCK_PARAMS.is_match(line)
}

fn opens_nested(line: &str) -> bool {
    opens_block(line)
        || [
            "if ", "unless ", "def ", "case ", "while ", "until ", "class ", "module ",
        ]
        .iter()
        .any(|kw| line.starts_with(kw))
        || line == "begin"
}

/// Skip lines up to the `end` closing a block whose opener was already read.
fn skip_block(lines: &mut Lines<'_>) {
    let mut depth = 1usize;
    for line in lines.by_ref() {
        let line = line.trim();
        if opens_nested(line) {
            depth += 1;
        } else if line == "end" || line.starts_with("end ") || line.starts_with("end.") {
            depth -= 1;
            if depth == 0 {
                return;
            }
        }
    }
}

/// Body of `def caveats … end`: a heredoc or a single string literal.
fn read_caveats_method(lines: &mut Lines<'_>) -> String {
    let mut text = String::new();
    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "end" {
            return text;
        }
        if let Some((terminator, squiggly)) = heredoc_terminator(line) {
            text = read_heredoc(lines, &terminator, squiggly);
        } else if let Some(literal) = string_literal(line) {
            text = literal;
        }
        break;
    }
    skip_block(lines);
    text
}

/// Detect `<<~EOS`, `<<-EOS` or `<<EOS` and return the terminator and whether
/// indentation is stripped.
fn heredoc_terminator(rest: &str) -> Option<(String, bool)> {
    let start = rest.find("<<")?;
    let after = &rest[start + 2..];
    let (squiggly, after) = match after.chars().next()? {
        '~' => (true, &after[1..]),
        '-' => (false, &after[1..]),
        _ => (false, after),
    };
    let terminator: String = after
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!terminator.is_empty()).then_some((terminator, squiggly))
}

fn read_heredoc(lines: &mut Lines<'_>, terminator: &str, squiggly: bool) -> String {
    let mut body: Vec<&str> = Vec::new();
    for line in lines.by_ref() {
        if line.trim() == terminator {
            break;
        }
        body.push(line);
    }

    if !squiggly {
        return body.join("\n");
    }

    let indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    body.iter()
        .map(|l| l.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First string literal in `rest`, with `\"`, `\'`, `\\` and `\n` unescaped.
fn string_literal(rest: &str) -> Option<String> {
    let start = rest.find(['"', '\''])?;
    let quote = rest[start..].chars().next()?;
    let mut out = String::new();
    let mut chars = rest[start + 1..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' if quote == '"' => out.push('\n'),
                e @ ('"' | '\'' | '\\') => out.push(e),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
    None
}

/// `rest` joined with the following lines while it ends in a comma.
fn continued(rest: &str, lines: &mut Lines<'_>) -> String {
    let mut joined = rest.to_string();
    while joined.trim_end().ends_with(',') {
        let Some(next) = lines.next() else {
            break;
        };
        joined.push(' ');
        joined.push_str(next.trim());
    }
    joined
}

/// Every `key: "literal"` argument in `rest`, in order.
fn keyword_literals(rest: &str) -> Vec<(String, String)> {
    KEYWORD_LITERAL
        .captures_iter(rest)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// A bare symbol argument such as `:no_check`.
fn symbol(rest: &str) -> Option<String> {
    rest.starts_with(':')
        .then(|| rest.split_whitespace().next().unwrap_or(rest).to_string())
}
