use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cartograph_config::Config;
use cartograph_site::{ContentId, Site};
use cartograph_storage::FsStorage;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
    let path = dir.path().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "cartograph.toml",
        r#"
[site]
title = "Handbook"
base_url = "/handbook/"

[[collections]]
name = "docs"
kind = "docs"
sidebars = "sidebars.yaml"

[[collections]]
name = "notes"
kind = "feed"
route_base_path = "/notes"
"#,
    );
    write(&dir, "sidebars.yaml", "main:\n  - intro\n  - guide/setup\n");
    write(&dir, "docs/intro.md", "# Intro\n\nNext: [setup](guide/setup.md)\n");
    write(&dir, "docs/guide/setup.md", "---\ntitle: Setup\n---\nInstall it.\n");
    write(&dir, "docs/_drafts/ignored.md", "# Ignored\n");
    write(&dir, "docs/.hidden/ignored.md", "# Ignored\n");
    write(&dir, "notes/2024-05-01-hello/index.md", "# Hello\n");
    dir
}

fn site(dir: &TempDir) -> Site {
    let config = Config::load(Some(&dir.path().join("cartograph.toml")), None).unwrap();
    Site::new(Arc::new(FsStorage::new()), Arc::new(config))
}

#[test]
fn test_builds_site_from_disk() {
    let dir = fixture();
    let site = site(&dir);

    let outcome = site.build();
    let site_map = outcome.site_map().unwrap();

    assert!(outcome.diagnostics().is_empty(), "{:#?}", outcome.diagnostics());
    let paths: Vec<_> = site_map.routes().entries().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/handbook/guide/setup",
            "/handbook/intro",
            "/handbook/notes",
            "/handbook/notes/2024/05/01/hello",
        ]
    );
    assert_eq!(site_map.catalog().len(), 3);
}

#[test]
fn test_diagnostic_paths_are_relative_to_site_root() {
    let dir = fixture();
    write(&dir, "sidebars.yaml", "main:\n  - intro\n  - missing\n");
    let site = site(&dir);

    let outcome = site.build();

    assert!(outcome.site_map().is_none());
    let location = outcome.diagnostics()[0].location.as_ref().unwrap();
    assert_eq!(location.file, PathBuf::from("sidebars.yaml"));
    assert_eq!(location.pointer.as_deref(), Some("main[1]"));
}

#[test]
fn test_rebuild_after_edit_on_disk() {
    let dir = fixture();
    let site = site(&dir);
    assert!(site.build().is_assembled());

    let path = write(&dir, "docs/guide/setup.md", "---\ntitle: Installation\n---\nInstall it.\n");
    let outcome = site.rebuild([path]);

    let site_map = outcome.site_map().unwrap();
    let setup = site_map
        .content(&ContentId::new("docs", "guide/setup"))
        .unwrap();
    assert_eq!(setup.title, "Installation");
}
