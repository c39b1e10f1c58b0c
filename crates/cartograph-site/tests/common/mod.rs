//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use cartograph_config::Config;
use cartograph_site::{BuildError, BuildOutcome, SiteMap};
use cartograph_storage::MockStorage;

pub const CONFIG: &str = r#"
[site]
title = "Handbook"

[build]
max_nav_depth = 3

[[collections]]
name = "docs"
kind = "docs"
sidebars = "sidebars.yaml"

[[collections]]
name = "fieldnotes"
kind = "feed"
route_base_path = "/fieldnotes"
posts_per_page = 2
sidebar_count = 2
authors_map = "fieldnotes/authors.yml"

[[pages]]
path = "/about"
source = "pages/about.md"

[[redirects]]
from = "/start"
to = "/intro"

[[navbar]]
label = "Docs"
to = "/intro"
"#;

pub const SIDEBARS: &str = "\
main:
  - intro
  - type: category
    label: Core
    items:
      - core/index
      - core/storage
      - core/models
";

/// Parse `toml` as if it lived in `/site/cartograph.toml`.
pub fn config(toml: &str) -> Arc<Config> {
    Arc::new(Config::from_toml_str(toml, Path::new("/site")).unwrap())
}

/// A small but complete site: docs with a sidebar, a feed with authors and
/// tags, a standalone page.
pub fn storage() -> MockStorage {
    MockStorage::new()
        .with_file(
            "/site/docs/intro.md",
            "---\nsidebar_position: 1\n---\n# Introduction\n\nRead about [models](core/models.md) first.\n",
        )
        .with_file("/site/docs/core/index.md", "# Core\n")
        .with_file(
            "/site/docs/core/models.md",
            "---\nsidebar_position: 2\n---\n# Models\n",
        )
        .with_file("/site/docs/core/storage.md", "# Storage\n")
        .with_file("/site/sidebars.yaml", SIDEBARS)
        .with_file(
            "/site/fieldnotes/authors.yml",
            "ada:\n  name: Ada\n  title: Maintainer\n",
        )
        .with_file(
            "/site/fieldnotes/2024-01-10-first.md",
            "---\ntitle: First Note\nauthors: ada\ntags: [Rust]\n---\nHello there.\n",
        )
        .with_file(
            "/site/fieldnotes/2024-02-20-second.md",
            "---\ntitle: Second Note\ntags: [Rust, Release]\n---\nMore.\n",
        )
        .with_file(
            "/site/fieldnotes/2024-03-05-third.md",
            "---\ntitle: Third Note\n---\nLatest.\n",
        )
        .with_file("/site/pages/about.md", "# About\n")
}

pub fn assembled(outcome: &BuildOutcome) -> &Arc<SiteMap> {
    match outcome.site_map() {
        Some(site_map) => site_map,
        None => panic!("build did not assemble: {:#?}", outcome.diagnostics()),
    }
}

/// Errors of a rejected build.
pub fn errors(outcome: &BuildOutcome) -> Vec<&BuildError> {
    assert!(!outcome.is_assembled(), "build unexpectedly assembled");
    outcome
        .diagnostics()
        .iter()
        .filter(|d| d.is_error())
        .map(|d| &d.error)
        .collect()
}
