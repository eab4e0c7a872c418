//! End-to-end tests for Den.
//!
//! These tests build the fixture tap into a temporary directory and inspect
//! the generated site.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use den_core::{Catalog, Config, ManifestError, Package, VersionRecord, parse_manifest};
use den_generator::{
    BuildError, Builder,
    payload::extract,
    template::{TemplateId, check_unresolved},
};
use den_releases::{EnrichmentError, PublishedRelease, ReleaseSource, RepoRef};
use walkdir::WalkDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn copy_tree(from: &Path, to: &Path) {
    for entry in WalkDir::new(from) {
        let entry = entry.unwrap();
        let target = to.join(entry.path().strip_prefix(from).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Copy the fixture tap into `root` and return a config pointing at it.
fn project(root: &Path) -> Config {
    copy_tree(&fixtures(), root);

    let mut config = Config::default();
    config.build.formula_dir = root.join("Formula");
    config.build.casks_dir = root.join("Casks");
    config.build.static_dir = root.join("static");
    config.build.output_dir = root.join("_site");
    config.site.copyright_year = Some(2026);
    config
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join("_site").join(relative)).unwrap()
}

fn site_files(out: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = WalkDir::new(out)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(out).unwrap().to_string_lossy().into_owned();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

fn release(tag: &str, date: &str, prerelease: bool) -> PublishedRelease {
    PublishedRelease {
        record: VersionRecord {
            version: tag.trim_start_matches('v').to_string(),
            tag: tag.to_string(),
            date: date.to_string(),
            url: format!("https://github.com/MrDemonWolf/iconwolf/releases/tag/{tag}"),
        },
        prerelease,
    }
}

/// Release data for iconwolf; every other repository fails.
struct FixedReleases;

#[async_trait]
impl ReleaseSource for FixedReleases {
    async fn releases(&self, repo: &RepoRef) -> den_releases::Result<Vec<PublishedRelease>> {
        match repo.repo.as_str() {
            "iconwolf" => Ok(vec![
                release("v0.0.6", "2026-02-01", false),
                release("v0.0.5", "2026-01-10", false),
            ]),
            _ => Err(EnrichmentError::NotFound {
                repo: repo.to_string(),
            }),
        }
    }
}

/// Every request fails.
struct FailingReleases;

#[async_trait]
impl ReleaseSource for FailingReleases {
    async fn releases(&self, _repo: &RepoRef) -> den_releases::Result<Vec<PublishedRelease>> {
        Err(EnrichmentError::RateLimited { status: 429 })
    }
}

#[tokio::test]
async fn test_output_tree() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Builder::new(project(dir.path()))
        .offline()
        .build()
        .await
        .unwrap();

    assert_eq!(stats.formulae, 1);
    assert_eq!(stats.casks, 1);
    assert_eq!(stats.pages, 3);

    let out = dir.path().join("_site");
    let files: Vec<_> = site_files(&out).into_iter().map(|(path, _)| path).collect();
    let expected: Vec<String> = [
        "favicon.svg",
        "formulae/iconwolf/index.html",
        "formulae/wolfdesk/index.html",
        "index.html",
        "output.css",
    ]
    .iter()
    .map(|p| Path::new(p).to_string_lossy().into_owned())
    .collect();
    assert_eq!(files, expected);

    assert_eq!(
        fs::read(out.join("output.css")).unwrap(),
        fs::read(fixtures().join("static/output.css")).unwrap()
    );
}

#[tokio::test]
async fn test_index_structure() {
    let dir = tempfile::tempdir().unwrap();
    Builder::new(project(dir.path()))
        .offline()
        .build()
        .await
        .unwrap();

    let html = read(dir.path(), "index.html");
    assert!(html.contains("<title>Homebrew Den</title>"));
    assert!(html.contains(r#"<meta name="description" content=""#));
    assert!(html.contains(r#"<link rel="stylesheet" href="output.css">"#));
    assert!(html.contains(r#"href="favicon.svg""#));
    assert!(html.contains("<nav"));
    assert!(html.contains(r#"<code id="tap-command">brew tap mrdemonwolf/den</code>"#));
    for id in ["formulae-section", "casks-section", "search-overlay", "theme-toggle"] {
        assert_eq!(html.matches(&format!(r#"id="{id}""#)).count(), 1, "{id}");
    }

    let footer = &html[html.find("<footer").unwrap()..html.find("</footer>").unwrap()];
    assert!(footer.contains("MIT"));
    assert!(footer.contains("2026"));
    assert!(footer.contains("MrDemonWolf"));

    let data: Catalog = extract(&html, "data").unwrap();
    assert_eq!(data.formulae[0].name, "iconwolf");
    assert_eq!(data.casks[0].name, "wolfdesk");
}

#[tokio::test]
async fn test_detail_structure() {
    let dir = tempfile::tempdir().unwrap();
    Builder::new(project(dir.path()))
        .offline()
        .build()
        .await
        .unwrap();

    let html = read(dir.path(), "formulae/iconwolf/index.html");
    assert!(html.contains("<title>iconwolf | Homebrew Den</title>"));
    assert!(html.contains(r#"<link rel="stylesheet" href="../../output.css">"#));
    assert!(html.contains(r#"href="../../favicon.svg""#));
    assert!(html.contains(r#"<span id="breadcrumb-name">iconwolf</span>"#));
    assert!(html.contains(r#"href="../../#formulae-section""#));
    for id in [
        "install-section",
        "details-section",
        "caveats-section",
        "versions-section",
        "sidebar-mobile",
    ] {
        assert_eq!(html.matches(&format!(r#"id="{id}""#)).count(), 1, "{id}");
    }
    assert!(html.contains("<aside"));
    assert!(html.contains(r#"<nav class="sidebar-nav""#));
    assert!(html.contains("iconwolf --help"));
    assert!(html.contains("brew install mrdemonwolf/den/iconwolf"));

    let cask = read(dir.path(), "formulae/wolfdesk/index.html");
    assert!(cask.contains(r#"href="../../#casks-section""#));
    assert!(cask.contains("No caveats for this package."));
}

#[tokio::test]
async fn test_payload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    Builder::new(project(dir.path()))
        .with_release_source(Arc::new(FixedReleases))
        .build()
        .await
        .unwrap();

    let source = fs::read_to_string(fixtures().join("Formula/iconwolf.rb")).unwrap();
    let expected = parse_manifest(&source, "iconwolf", den_core::PackageKind::Formula)
        .unwrap()
        .with_history(
            vec![
                release("v0.0.6", "2026-02-01", false).record,
                release("v0.0.5", "2026-01-10", false).record,
            ],
            false,
        );

    let html = read(dir.path(), "formulae/iconwolf/index.html");
    let formula: Package = extract(&html, "formula").unwrap();
    assert_eq!(formula, expected);

    let data: Catalog = extract(&html, "data").unwrap();
    assert_eq!(data.formulae[0], expected);
    assert!(html.contains("2026-01-10"));
}

#[tokio::test]
async fn test_zero_major_is_alpha() {
    let dir = tempfile::tempdir().unwrap();
    Builder::new(project(dir.path()))
        .offline()
        .build()
        .await
        .unwrap();

    let html = read(dir.path(), "formulae/iconwolf/index.html");
    let formula: serde_json::Value = extract(&html, "formula").unwrap();
    assert_eq!(formula["version"], "0.0.6");
    assert_eq!(formula["stability"], "alpha");

    let cask = read(dir.path(), "formulae/wolfdesk/index.html");
    let formula: serde_json::Value = extract(&cask, "formula").unwrap();
    assert_eq!(formula["stability"], "stable");
}

#[tokio::test]
async fn test_no_placeholder_survives() {
    let dir = tempfile::tempdir().unwrap();
    Builder::new(project(dir.path()))
        .with_release_source(Arc::new(FixedReleases))
        .build()
        .await
        .unwrap();

    let out = dir.path().join("_site");
    for (path, bytes) in site_files(&out) {
        if path.ends_with(".html") {
            let html = String::from_utf8(bytes).unwrap();
            assert!(check_unresolved(TemplateId::Index, &html).is_ok(), "{path}");
        }
    }
}

#[tokio::test]
async fn test_degraded_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Builder::new(project(dir.path()))
        .with_release_source(Arc::new(FailingReleases))
        .build()
        .await
        .unwrap();

    assert_eq!(stats.degraded, 2);
    let html = read(dir.path(), "formulae/iconwolf/index.html");
    let formula: Package = extract(&html, "formula").unwrap();
    assert!(formula.versions.is_empty());
    assert!(html.contains("No release history available."));
}

#[tokio::test]
async fn test_idempotent_builds() {
    let dir = tempfile::tempdir().unwrap();
    let builder = Builder::new(project(dir.path())).with_release_source(Arc::new(FixedReleases));
    let out = dir.path().join("_site");

    builder.build().await.unwrap();
    let first = site_files(&out);
    builder.build().await.unwrap();
    let second = site_files(&out);

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_checksum_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = project(dir.path());
    let manifest = config.build.formula_dir.join("iconwolf.rb");
    let source = fs::read_to_string(&manifest).unwrap();
    let broken: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with("sha256"))
        .map(|line| format!("{line}\n"))
        .collect();
    fs::write(&manifest, broken).unwrap();

    let err = Builder::new(config).offline().build().await.unwrap_err();
    match err {
        BuildError::Collector(err) => assert!(matches!(
            err.manifest_error(),
            Some(ManifestError::MissingChecksum { .. })
        )),
        other => panic!("expected a collector error, got {other}"),
    }
    assert!(!dir.path().join("_site").exists());
}
