//! Configuration management for Cartograph.
//!
//! Parses `cartograph.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Every table rejects unknown keys, so a typo in a collection option is a
//! load error rather than a silently ignored setting. Relative paths are
//! resolved against the directory containing the config file.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.url`
//! - `site.base_url`
//! - `collections[].edit_url`

mod expand;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override preview mode (drafts included).
    pub preview: Option<bool>,
    /// Override strict scanning (unreadable sources fail the build).
    pub strict_scan: Option<bool>,
    /// Override the site map output path.
    pub output: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "cartograph.toml";

/// Name reserved for the collection holding standalone pages.
pub const PAGES_COLLECTION: &str = "pages";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteSettings,
    /// Build behaviour.
    pub build: BuildSettings,
    /// Link validation strictness.
    pub validation: ValidationSettings,
    /// Content collections as parsed from TOML.
    collections: Vec<CollectionConfigRaw>,
    /// Standalone pages as parsed from TOML.
    pages: Vec<PageConfigRaw>,
    /// Redirects from old paths to live routes.
    pub redirects: Vec<RedirectConfig>,
    /// Top navigation bar links.
    pub navbar: Vec<LinkItem>,
    /// Footer link columns.
    pub footer: Vec<FooterColumn>,

    /// Resolved collections (set after loading).
    #[serde(skip)]
    pub collections_resolved: Vec<CollectionConfig>,
    /// Resolved standalone pages (set after loading).
    #[serde(skip)]
    pub pages_resolved: Vec<PageConfig>,
    /// Directory relative paths are resolved against (set after loading).
    #[serde(skip)]
    pub root_dir: PathBuf,
    /// Absolute site map output path (set after loading).
    #[serde(skip)]
    pub output_resolved: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Site-wide settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// Site title (display only).
    pub title: String,
    /// Absolute production URL, empty when unknown.
    pub url: String,
    /// Path prefix every route is served under.
    pub base_url: String,
    /// Locale tag attached to every route.
    pub locale: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            url: String::new(),
            base_url: "/".to_owned(),
            locale: "en".to_owned(),
        }
    }
}

/// Build behaviour settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Include draft content.
    pub preview: bool,
    /// Treat unreadable or malformed sources as fatal instead of skipping them.
    pub strict_scan: bool,
    /// Maximum category nesting accepted in a sidebar specification.
    pub max_nav_depth: usize,
    /// Site map output path, relative to the config directory.
    output: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            preview: false,
            strict_scan: false,
            max_nav_depth: 32,
            output: "build/sitemap.json".to_owned(),
        }
    }
}

/// How a dangling link of a given class is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPolicy {
    /// Fail the build.
    Error,
    /// Report and continue.
    Warn,
    /// Do not check.
    Ignore,
}

/// Link validation strictness.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    /// Sidebar links, redirects, navbar and footer targets.
    pub nav_links: LinkPolicy,
    /// Links found in content bodies.
    pub cross_references: LinkPolicy,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            nav_links: LinkPolicy::Error,
            cross_references: LinkPolicy::Warn,
        }
    }
}

/// Kind of content collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Hierarchical documentation addressed by sidebars.
    Docs,
    /// Chronological posts.
    Feed,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docs => f.write_str("docs"),
            Self::Feed => f.write_str("feed"),
        }
    }
}

/// Raw collection configuration as parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectionConfigRaw {
    name: String,
    kind: CollectionKind,
    path: Option<String>,
    route_base_path: Option<String>,
    // docs
    sidebars: Option<String>,
    edit_url: Option<String>,
    // feed
    posts_per_page: Option<usize>,
    sidebar_count: Option<usize>,
    sidebar_title: Option<String>,
    authors_map: Option<String>,
    show_reading_time: Option<bool>,
}

impl CollectionConfigRaw {
    /// The collection used when the config declares none.
    fn default_docs() -> Self {
        Self {
            name: "docs".to_owned(),
            kind: CollectionKind::Docs,
            path: None,
            route_base_path: None,
            sidebars: None,
            edit_url: None,
            posts_per_page: None,
            sidebar_count: None,
            sidebar_title: None,
            authors_map: None,
            show_reading_time: None,
        }
    }

    /// Names of options set on this collection that only apply to the other kind.
    fn foreign_options(&self) -> Vec<&'static str> {
        let mut foreign = Vec::new();
        match self.kind {
            CollectionKind::Docs => {
                let feed_only = [
                    ("posts_per_page", self.posts_per_page.is_some()),
                    ("sidebar_count", self.sidebar_count.is_some()),
                    ("sidebar_title", self.sidebar_title.is_some()),
                    ("authors_map", self.authors_map.is_some()),
                    ("show_reading_time", self.show_reading_time.is_some()),
                ];
                foreign.extend(feed_only.iter().filter(|(_, set)| *set).map(|(n, _)| *n));
            }
            CollectionKind::Feed => {
                let docs_only = [
                    ("sidebars", self.sidebars.is_some()),
                    ("edit_url", self.edit_url.is_some()),
                ];
                foreign.extend(docs_only.iter().filter(|(_, set)| *set).map(|(n, _)| *n));
            }
        }
        foreign
    }
}

/// Resolved collection configuration with absolute paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Unique collection name.
    pub name: String,
    /// Absolute source directory.
    pub source_dir: PathBuf,
    /// Route prefix for every item of the collection.
    pub route_base_path: String,
    /// Kind-specific options.
    pub options: CollectionOptions,
}

impl CollectionConfig {
    /// Kind of this collection.
    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        match self.options {
            CollectionOptions::Docs(_) => CollectionKind::Docs,
            CollectionOptions::Feed(_) => CollectionKind::Feed,
        }
    }
}

/// Kind-specific collection options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionOptions {
    /// Options of a docs collection.
    Docs(DocsOptions),
    /// Options of a feed collection.
    Feed(FeedOptions),
}

/// Options of a docs collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocsOptions {
    /// Absolute path to the sidebar specification, if any.
    pub sidebars: Option<PathBuf>,
    /// Prefix of "edit this page" links; the item's source path is appended.
    pub edit_url: Option<String>,
}

/// Options of a feed collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedOptions {
    /// Posts per listing page.
    pub posts_per_page: usize,
    /// Number of recent posts in the feed navigation section.
    pub sidebar_count: usize,
    /// Label of the feed navigation section.
    pub sidebar_title: String,
    /// Absolute path to the authors map, if any.
    pub authors_map: Option<PathBuf>,
    /// Compute reading time for posts.
    pub show_reading_time: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            sidebar_count: 5,
            sidebar_title: "Recent posts".to_owned(),
            authors_map: None,
            show_reading_time: true,
        }
    }
}

/// Raw standalone page configuration as parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageConfigRaw {
    path: String,
    source: String,
}

/// Standalone page with an explicitly configured route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageConfig {
    /// Route path (leading slash).
    pub path: String,
    /// Source file relative to [`Config::root_dir`].
    pub source: PathBuf,
}

/// Redirect from an old path to a live route.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectConfig {
    /// Old path.
    pub from: String,
    /// Target path.
    pub to: String,
}

/// Navbar or footer link; exactly one of `to` (internal) and `href` (external).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkItem {
    /// Display label.
    pub label: String,
    /// Internal route target.
    #[serde(default)]
    pub to: Option<String>,
    /// External URL.
    #[serde(default)]
    pub href: Option<String>,
}

/// Titled group of footer links.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FooterColumn {
    /// Column title.
    pub title: String,
    /// Links in the column.
    #[serde(default)]
    pub items: Vec<LinkItem>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.url`").
        field: String,
        /// Error message (e.g., "${`SITE_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a route field to be absolute.
fn require_absolute_route(route: &str, field: &str) -> Result<(), ConfigError> {
    if !route.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start with '/'"
        )));
    }
    Ok(())
}

impl LinkItem {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        require_non_empty(&self.label, &format!("{field}.label"))?;
        match (&self.to, &self.href) {
            (Some(to), None) => require_absolute_route(to, &format!("{field}.to")),
            (None, Some(href)) => require_non_empty(href, &format!("{field}.href")),
            _ => Err(ConfigError::Validation(format!(
                "{field} needs exactly one of `to` or `href`"
            ))),
        }
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `cartograph.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Parse and resolve configuration from a TOML string.
    ///
    /// Relative paths are resolved against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion, resolution or validation fails.
    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(preview) = settings.preview {
            self.build.preview = preview;
        }
        if let Some(strict_scan) = settings.strict_scan {
            self.build.strict_scan = strict_scan;
        }
        if let Some(output) = &settings.output {
            self.output_resolved.clone_from(output);
        }
    }

    /// Look up a resolved collection by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections_resolved.iter().find(|c| c.name == name)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    ///
    /// The default declares a single `docs` collection rooted at `docs/`
    /// without a sidebar specification.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            site: SiteSettings::default(),
            build: BuildSettings::default(),
            validation: ValidationSettings::default(),
            collections: Vec::new(),
            pages: Vec::new(),
            redirects: Vec::new(),
            navbar: Vec::new(),
            footer: Vec::new(),
            collections_resolved: Vec::new(),
            pages_resolved: Vec::new(),
            root_dir: PathBuf::new(),
            output_resolved: PathBuf::new(),
            config_path: None,
        };
        config.collections_resolved = vec![Self::resolve_collection(
            &CollectionConfigRaw::default_docs(),
            base,
        )];
        config.root_dir = base.to_path_buf();
        config.output_resolved = base.join(&config.build.output);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml_str(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_build()?;
        self.validate_collections()?;
        self.validate_links()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        require_absolute_route(&self.site.base_url, "site.base_url")?;
        require_non_empty(&self.site.locale, "site.locale")?;
        if !self.site.url.is_empty() {
            require_http_url(&self.site.url, "site.url")?;
        }
        Ok(())
    }

    fn validate_build(&self) -> Result<(), ConfigError> {
        if self.build.max_nav_depth == 0 {
            return Err(ConfigError::Validation(
                "build.max_nav_depth must be greater than 0".to_owned(),
            ));
        }
        require_non_empty(&self.build.output, "build.output")
    }

    fn validate_collections(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for (i, raw) in self.collections.iter().enumerate() {
            let field = format!("collections[{i}]");
            require_non_empty(&raw.name, &format!("{field}.name"))?;
            if raw.name == PAGES_COLLECTION {
                return Err(ConfigError::Validation(format!(
                    "{field}.name `{PAGES_COLLECTION}` is reserved for standalone pages"
                )));
            }
            if !names.insert(raw.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{field}.name `{}` is declared twice",
                    raw.name
                )));
            }
            if let Some(option) = raw.foreign_options().first() {
                return Err(ConfigError::Validation(format!(
                    "{field}.{option} is not valid for {} collections",
                    raw.kind
                )));
            }
            if raw.posts_per_page == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "{field}.posts_per_page must be greater than 0"
                )));
            }
            if let Some(edit_url) = &raw.edit_url {
                require_http_url(edit_url, &format!("{field}.edit_url"))?;
            }
        }

        for (i, page) in self.pages.iter().enumerate() {
            require_absolute_route(&page.path, &format!("pages[{i}].path"))?;
            require_non_empty(&page.source, &format!("pages[{i}].source"))?;
        }
        Ok(())
    }

    fn validate_links(&self) -> Result<(), ConfigError> {
        for (i, redirect) in self.redirects.iter().enumerate() {
            require_absolute_route(&redirect.from, &format!("redirects[{i}].from"))?;
            require_non_empty(&redirect.to, &format!("redirects[{i}].to"))?;
            if redirect.from == redirect.to {
                return Err(ConfigError::Validation(format!(
                    "redirects[{i}] redirects `{}` to itself",
                    redirect.from
                )));
            }
        }
        for (i, item) in self.navbar.iter().enumerate() {
            item.validate(&format!("navbar[{i}]"))?;
        }
        for (i, column) in self.footer.iter().enumerate() {
            require_non_empty(&column.title, &format!("footer[{i}].title"))?;
            for (j, item) in column.items.iter().enumerate() {
                item.validate(&format!("footer[{i}].items[{j}]"))?;
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.url = expand::expand_env(&self.site.url, "site.url")?;
        self.site.base_url = expand::expand_env(&self.site.base_url, "site.base_url")?;

        for (i, collection) in self.collections.iter_mut().enumerate() {
            if let Some(ref url) = collection.edit_url {
                collection.edit_url = Some(expand::expand_env(
                    url,
                    &format!("collections[{i}].edit_url"),
                )?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        self.root_dir = config_dir.to_path_buf();
        self.output_resolved = config_dir.join(&self.build.output);

        self.collections_resolved = if self.collections.is_empty() {
            vec![Self::resolve_collection(
                &CollectionConfigRaw::default_docs(),
                config_dir,
            )]
        } else {
            self.collections
                .iter()
                .map(|raw| Self::resolve_collection(raw, config_dir))
                .collect()
        };

        self.pages_resolved = self
            .pages
            .iter()
            .map(|raw| PageConfig {
                path: raw.path.clone(),
                source: PathBuf::from(&raw.source),
            })
            .collect();

        Ok(())
    }

    fn resolve_collection(raw: &CollectionConfigRaw, config_dir: &Path) -> CollectionConfig {
        let source_dir = config_dir.join(raw.path.as_deref().unwrap_or(&raw.name));
        let default_base = match raw.kind {
            CollectionKind::Docs => "/",
            CollectionKind::Feed => raw.name.as_str(),
        };
        let route_base_path = raw
            .route_base_path
            .clone()
            .unwrap_or_else(|| default_base.to_owned());

        let options = match raw.kind {
            CollectionKind::Docs => CollectionOptions::Docs(DocsOptions {
                sidebars: raw.sidebars.as_ref().map(|s| config_dir.join(s)),
                edit_url: raw.edit_url.clone(),
            }),
            CollectionKind::Feed => {
                let defaults = FeedOptions::default();
                CollectionOptions::Feed(FeedOptions {
                    posts_per_page: raw.posts_per_page.unwrap_or(defaults.posts_per_page),
                    sidebar_count: raw.sidebar_count.unwrap_or(defaults.sidebar_count),
                    sidebar_title: raw
                        .sidebar_title
                        .clone()
                        .unwrap_or(defaults.sidebar_title),
                    authors_map: raw.authors_map.as_ref().map(|s| config_dir.join(s)),
                    show_reading_time: raw
                        .show_reading_time
                        .unwrap_or(defaults.show_reading_time),
                })
            }
        };

        CollectionConfig {
            name: raw.name.clone(),
            source_dir,
            route_base_path,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FOUNDRY_TOML: &str = r#"
[site]
title = "Foundry"
url = "https://foundry.example.com"

[validation]
cross_references = "error"

[[collections]]
name = "docs"
kind = "docs"
route_base_path = "/"
sidebars = "sidebars.yaml"
edit_url = "https://github.com/acme/foundry/tree/main/"

[[collections]]
name = "fieldnotes"
kind = "feed"
posts_per_page = 10
sidebar_count = 10
sidebar_title = "Recent Notes"
authors_map = "fieldnotes/authors.yml"

[[pages]]
path = "/about"
source = "pages/about.md"

[[redirects]]
from = "/blog"
to = "/fieldnotes"

[[navbar]]
label = "Core"
to = "/core"

[[navbar]]
label = "GitHub"
href = "https://github.com/acme"

[[footer]]
title = "Resources"
items = [{ label = "Field Notes", to = "/fieldnotes" }]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.site.base_url, "/");
        assert_eq!(config.site.locale, "en");
        assert!(!config.build.preview);
        assert_eq!(config.build.max_nav_depth, 32);
        assert_eq!(config.validation.nav_links, LinkPolicy::Error);
        assert_eq!(config.validation.cross_references, LinkPolicy::Warn);
        assert_eq!(
            config.output_resolved,
            PathBuf::from("/test/build/sitemap.json")
        );
        assert_eq!(config.collections_resolved.len(), 1);
        let docs = &config.collections_resolved[0];
        assert_eq!(docs.name, "docs");
        assert_eq!(docs.source_dir, PathBuf::from("/test/docs"));
        assert_eq!(docs.route_base_path, "/");
        assert_eq!(docs.kind(), CollectionKind::Docs);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml_str("", Path::new("/project")).unwrap();
        assert_eq!(config.collections_resolved.len(), 1);
        assert_eq!(config.collections_resolved[0].name, "docs");
        assert!(config.pages_resolved.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(FOUNDRY_TOML, Path::new("/project")).unwrap();

        assert_eq!(config.site.title, "Foundry");
        assert_eq!(config.validation.cross_references, LinkPolicy::Error);
        assert_eq!(config.collections_resolved.len(), 2);

        let docs = config.collection("docs").unwrap();
        assert_eq!(
            docs.options,
            CollectionOptions::Docs(DocsOptions {
                sidebars: Some(PathBuf::from("/project/sidebars.yaml")),
                edit_url: Some("https://github.com/acme/foundry/tree/main/".to_owned()),
            })
        );

        let notes = config.collection("fieldnotes").unwrap();
        assert_eq!(notes.source_dir, PathBuf::from("/project/fieldnotes"));
        assert_eq!(notes.route_base_path, "fieldnotes");
        let CollectionOptions::Feed(feed) = &notes.options else {
            panic!("expected feed options");
        };
        assert_eq!(feed.posts_per_page, 10);
        assert_eq!(feed.sidebar_count, 10);
        assert_eq!(feed.sidebar_title, "Recent Notes");
        assert_eq!(
            feed.authors_map,
            Some(PathBuf::from("/project/fieldnotes/authors.yml"))
        );
        assert!(feed.show_reading_time);

        assert_eq!(
            config.pages_resolved,
            vec![PageConfig {
                path: "/about".to_owned(),
                source: PathBuf::from("pages/about.md"),
            }]
        );
        assert_eq!(config.redirects[0].to, "/fieldnotes");
        assert_eq!(config.navbar.len(), 2);
        assert_eq!(config.footer[0].items[0].to.as_deref(), Some("/fieldnotes"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = r#"
[[collections]]
name = "docs"
kind = "docs"
sidebar = "sidebars.yaml"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn test_feed_option_on_docs_rejected() {
        let toml = r#"
[[collections]]
name = "docs"
kind = "docs"
posts_per_page = 5
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("collections[0].posts_per_page"));
    }

    #[test]
    fn test_duplicate_collection_name_rejected() {
        let toml = r#"
[[collections]]
name = "docs"
kind = "docs"

[[collections]]
name = "docs"
kind = "feed"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_reserved_pages_name_rejected() {
        let toml = r#"
[[collections]]
name = "pages"
kind = "docs"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_link_item_requires_exactly_one_target() {
        let toml = r#"
[[navbar]]
label = "Broken"
to = "/core"
href = "https://example.com"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("navbar[0]"));
    }

    #[test]
    fn test_redirect_to_itself_rejected() {
        let toml = r#"
[[redirects]]
from = "/a"
to = "/a"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("to itself"));
    }

    #[test]
    fn test_base_url_must_be_absolute() {
        let toml = r#"
[site]
base_url = "docs/"
"#;
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("site.base_url"));
    }

    #[test]
    fn test_zero_nav_depth_rejected() {
        let toml = r"
[build]
max_nav_depth = 0
";
        let err = Config::from_toml_str(toml, Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("max_nav_depth"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings {
            preview: Some(true),
            output: Some(PathBuf::from("/out/map.json")),
            ..Default::default()
        });

        assert!(config.build.preview);
        assert!(!config.build.strict_scan); // Unchanged
        assert_eq!(config.output_resolved, PathBuf::from("/out/map.json"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cartograph.toml");
        std::fs::write(&path, FOUNDRY_TOML).unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.root_dir, dir.path());
        assert_eq!(
            config.collection("docs").unwrap().source_dir,
            dir.path().join("docs")
        );
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/cartograph.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
