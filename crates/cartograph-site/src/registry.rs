//! Content registry.
//!
//! Scans every configured collection through [`Storage`] and turns the
//! sources into an immutable [`Catalog`] of [`ContentItem`]s keyed by
//! [`ContentId`]. Collections are scanned in parallel; the merge runs in
//! configuration order so the catalog and its diagnostics are deterministic.
//!
//! # Ids
//!
//! - docs: path relative to the collection root without extension
//!   (`core/index`); a front-matter `id` replaces the final segment
//! - feed: same, except folder posts (`<name>/index.md`) use the folder name
//! - pages: source path without extension, in the `pages` collection

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use cartograph_config::{
    CollectionConfig, CollectionOptions, PAGES_COLLECTION, PageConfig,
};
use cartograph_storage::{SourceDocument, Storage, StorageError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::context::{BuildContext, Rejected};
use crate::diagnostics::{BuildError, SourceLocation};
use crate::links::extract_cross_refs;
use crate::slug::normalize_path;

static DATE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.+)$").expect("valid date prefix regex")
});

/// Identifier of a content item: collection plus id within it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId {
    /// Owning collection.
    pub collection: String,
    /// Id within the collection (e.g., `core/index`).
    pub id: String,
}

impl ContentId {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.id)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What kind of unit an item is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Docs collection item.
    Doc,
    /// Feed post.
    Post,
    /// Standalone page.
    Page,
}

/// Resolved front matter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentMetadata {
    /// Display title.
    pub title: String,
    /// Explicit sibling order.
    pub order: Option<f64>,
    /// Tags, trimmed and deduplicated.
    pub tags: Vec<String>,
    /// Publication date.
    pub date: Option<NaiveDate>,
    /// Draft flag.
    pub draft: bool,
    /// Short summary.
    pub description: Option<String>,
    /// Navigation label override.
    pub sidebar_label: Option<String>,
    /// Slug override as written.
    pub slug: Option<String>,
    /// Author keys.
    pub authors: Vec<String>,
}

/// In-body link found at scan time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossRef {
    /// Link destination as written.
    pub target: String,
    /// 1-based line in the source file.
    pub line: usize,
}

/// A content unit. Immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentItem {
    /// Identifier.
    pub id: ContentId,
    /// Unit kind.
    pub kind: ItemKind,
    /// Directory the source path is relative to.
    pub source_root: PathBuf,
    /// Source path relative to `source_root`.
    pub source_path: PathBuf,
    /// Route path relative to the collection base (leading slash).
    pub canonical_slug: String,
    /// Resolved front matter.
    pub metadata: ContentMetadata,
    /// In-body links.
    pub cross_refs: Vec<CrossRef>,
    /// Words in the body, for reading time.
    pub word_count: usize,
}

impl ContentItem {
    /// Label shown in navigation when the sidebar gives none.
    #[must_use]
    pub fn nav_label(&self) -> &str {
        self.metadata
            .sidebar_label
            .as_deref()
            .unwrap_or(&self.metadata.title)
    }

    /// Whether the item is part of the built site.
    #[must_use]
    pub fn is_visible(&self, preview: bool) -> bool {
        preview || !self.metadata.draft
    }

    /// Absolute source file path.
    #[must_use]
    pub fn source_file(&self) -> PathBuf {
        self.source_root.join(&self.source_path)
    }

    /// Whether two versions of an item resolve to the same routes.
    pub(crate) fn same_routing(&self, other: &Self) -> bool {
        self.id == other.id
            && self.canonical_slug == other.canonical_slug
            && self.metadata.date == other.metadata.date
            && self.metadata.draft == other.metadata.draft
            && self.metadata.tags == other.metadata.tags
    }
}

/// Author entry of a feed collection's authors map.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Role or affiliation.
    #[serde(default)]
    pub title: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Author key to author.
pub type AuthorsMap = BTreeMap<String, Author>;

/// Immutable catalog of every loaded item.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: BTreeMap<ContentId, Arc<ContentItem>>,
    sources: HashMap<(String, PathBuf), ContentId>,
    authors: BTreeMap<String, Arc<AuthorsMap>>,
}

impl Catalog {
    /// Look up an item by id.
    #[must_use]
    pub fn lookup(&self, id: &ContentId) -> Option<&Arc<ContentItem>> {
        self.items.get(id)
    }

    /// Look up an item by collection and id.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<&Arc<ContentItem>> {
        self.items.get(&ContentId::new(collection, id))
    }

    /// Look up an item by its source path relative to its collection root.
    #[must_use]
    pub fn by_source(&self, collection: &str, source_path: &Path) -> Option<&Arc<ContentItem>> {
        self.sources
            .get(&(collection.to_owned(), source_path.to_path_buf()))
            .and_then(|id| self.items.get(id))
    }

    /// All items ordered by id.
    pub fn items(&self) -> impl Iterator<Item = &Arc<ContentItem>> {
        self.items.values()
    }

    /// Items of one collection ordered by id.
    pub fn collection_items<'a>(
        &'a self,
        collection: &str,
    ) -> impl Iterator<Item = &'a Arc<ContentItem>> {
        self.items
            .values()
            .filter(move |item| item.id.collection == collection)
    }

    /// Visible posts of a feed collection, newest first, ties by id.
    #[must_use]
    pub fn posts_newest_first(&self, collection: &str, preview: bool) -> Vec<&Arc<ContentItem>> {
        let mut posts: Vec<_> = self
            .collection_items(collection)
            .filter(|item| item.kind == ItemKind::Post && item.is_visible(preview))
            .collect();
        posts.sort_by(|a, b| {
            b.metadata
                .date
                .cmp(&a.metadata.date)
                .then_with(|| a.id.cmp(&b.id))
        });
        posts
    }

    /// Authors map of a feed collection, if one was loaded.
    #[must_use]
    pub fn authors(&self, collection: &str) -> Option<&AuthorsMap> {
        self.authors.get(collection).map(AsRef::as_ref)
    }

    pub(crate) fn shared_authors(&self, collection: &str) -> Option<Arc<AuthorsMap>> {
        self.authors.get(collection).map(Arc::clone)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an item. Returns the item already holding the id on conflict.
    pub(crate) fn insert(&mut self, item: Arc<ContentItem>) -> Result<(), Arc<ContentItem>> {
        if let Some(existing) = self.items.get(&item.id) {
            return Err(Arc::clone(existing));
        }
        self.sources.insert(
            (item.id.collection.clone(), item.source_path.clone()),
            item.id.clone(),
        );
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Remove the item loaded from a source path.
    pub(crate) fn remove_source(
        &mut self,
        collection: &str,
        source_path: &Path,
    ) -> Option<Arc<ContentItem>> {
        let id = self
            .sources
            .remove(&(collection.to_owned(), source_path.to_path_buf()))?;
        self.items.remove(&id)
    }
}

/// Where a source document comes from and how it becomes an item.
#[derive(Clone, Copy)]
pub(crate) enum Origin<'a> {
    Collection {
        config: &'a CollectionConfig,
        authors: Option<&'a AuthorsMap>,
    },
    Page {
        config: &'a PageConfig,
        root: &'a Path,
    },
}

impl Origin<'_> {
    pub fn collection_name(&self) -> &str {
        match self {
            Self::Collection { config, .. } => &config.name,
            Self::Page { .. } => PAGES_COLLECTION,
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Self::Collection { config, .. } => &config.source_dir,
            Self::Page { root, .. } => root,
        }
    }

    /// Turn a loaded source into a content item.
    pub fn build_item(&self, doc: SourceDocument) -> Result<ContentItem, BuildError> {
        let SourceDocument {
            rel_path,
            front_matter: fm,
            body,
            body_line,
            title,
        } = doc;
        let collection = self.collection_name().to_owned();
        let path_id = path_id(&rel_path);
        let invalid = |id: &str, message: String| BuildError::InvalidMetadata {
            id: ContentId::new(collection.clone(), id),
            message,
        };

        if let Some(explicit) = &fm.id
            && (explicit.is_empty() || explicit.contains('/'))
        {
            return Err(invalid(
                &path_id,
                format!("front matter id `{explicit}` must be a single non-empty segment"),
            ));
        }

        let date = match fm.date.as_deref() {
            Some(raw) => Some(
                parse_date(raw)
                    .ok_or_else(|| invalid(&path_id, format!("unparseable date `{raw}`")))?,
            ),
            None => None,
        };

        let (kind, id, canonical_slug, date) = match self {
            Self::Page { config, .. } => {
                (ItemKind::Page, path_id, normalize_path(&config.path), date)
            }
            Self::Collection { config, authors } => match &config.options {
                CollectionOptions::Docs(_) => {
                    let id = apply_front_matter_id(&path_id, fm.id.as_deref());
                    let slug = docs_slug(&id, fm.slug.as_deref());
                    (ItemKind::Doc, id, slug, date)
                }
                CollectionOptions::Feed(_) => {
                    let base_id = strip_index_segment(&path_id);
                    let id = apply_front_matter_id(base_id, fm.id.as_deref());
                    let last = base_id.rsplit('/').next().unwrap_or(base_id);
                    let date = match (date, DATE_PREFIX_RE.captures(last)) {
                        (Some(date), _) => date,
                        (None, Some(caps)) => parse_date(&caps[1]).ok_or_else(|| {
                            let date = &caps[1];
                            invalid(&id, format!("file name date `{date}` is not a valid date"))
                        })?,
                        (None, None) => {
                            return Err(invalid(
                                &id,
                                "post has no `date` front matter and no YYYY-MM-DD- file name prefix"
                                    .to_owned(),
                            ));
                        }
                    };
                    if let Some(map) = authors
                        && let Some(unknown) = fm.authors.iter().find(|a| !map.contains_key(*a))
                    {
                        return Err(invalid(&id, format!("unknown author `{unknown}`")));
                    }
                    let slug = feed_slug(&id, date, fm.slug.as_deref());
                    (ItemKind::Post, id, slug, Some(date))
                }
            },
        };

        let mut tags: Vec<String> = Vec::with_capacity(fm.tags.len());
        for tag in fm.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_owned());
            }
        }

        Ok(ContentItem {
            id: ContentId::new(collection, id),
            kind,
            source_root: self.root().to_path_buf(),
            cross_refs: extract_cross_refs(&body, body_line),
            word_count: body.split_whitespace().count(),
            source_path: rel_path,
            canonical_slug,
            metadata: ContentMetadata {
                title,
                order: fm.sidebar_position,
                tags,
                date,
                draft: fm.draft,
                description: fm.description,
                sidebar_label: fm.sidebar_label,
                slug: fm.slug,
                authors: fm.authors,
            },
        })
    }
}

/// Path relative to a root, without extension, `/`-separated.
fn path_id(rel_path: &Path) -> String {
    rel_path
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn apply_front_matter_id(path_id: &str, explicit: Option<&str>) -> String {
    match (explicit, path_id.rsplit_once('/')) {
        (Some(explicit), Some((dir, _))) => format!("{dir}/{explicit}"),
        (Some(explicit), None) => explicit.to_owned(),
        (None, _) => path_id.to_owned(),
    }
}

/// Drop a trailing `index` segment (`core/index` → `core`, `index` → ``).
fn strip_index_segment(id: &str) -> &str {
    if id == "index" {
        ""
    } else {
        id.strip_suffix("/index").unwrap_or(id)
    }
}

fn docs_slug(id: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(slug) if slug.starts_with('/') => normalize_path(slug),
        Some(slug) => match id.rsplit_once('/') {
            Some((dir, _)) => normalize_path(&format!("{dir}/{slug}")),
            None => normalize_path(slug),
        },
        None => normalize_path(strip_index_segment(id)),
    }
}

fn feed_slug(id: &str, date: NaiveDate, explicit: Option<&str>) -> String {
    if let Some(slug) = explicit {
        return normalize_path(slug);
    }
    let (dir, last) = match id.rsplit_once('/') {
        Some((dir, last)) => (dir, last),
        None => ("", id),
    };
    let name = DATE_PREFIX_RE
        .captures(last)
        .and_then(|caps| caps.get(2))
        .map_or(last, |m| m.as_str());
    normalize_path(&format!("{}/{dir}/{name}", date.format("%Y/%m/%d")))
}

/// Parse `YYYY-MM-DD`, optionally followed by a time.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Report a source that could not be loaded.
///
/// Fatal only in strict scan mode.
pub(crate) fn report_scan_failure(ctx: &mut BuildContext, path: &Path, error: &StorageError) {
    let display = ctx.display_path(path);
    let err = BuildError::ScanError {
        path: display.clone(),
        message: error.to_string(),
    };
    let location = Some(SourceLocation::file(display));
    if ctx.config().build.strict_scan {
        ctx.error(err, location);
    } else {
        ctx.warn(err, location);
    }
}

/// Build an item from a loaded source and add it to the catalog.
pub(crate) fn add_document(
    ctx: &mut BuildContext,
    catalog: &mut Catalog,
    origin: &Origin<'_>,
    doc: SourceDocument,
) -> Option<Arc<ContentItem>> {
    let source_file = ctx.display_path(&origin.root().join(&doc.rel_path));
    match origin.build_item(doc) {
        Ok(item) => {
            let item = Arc::new(item);
            match catalog.insert(Arc::clone(&item)) {
                Ok(()) => {
                    tracing::debug!(id = %item.id, path = %source_file.display(), "Loaded item");
                    Some(item)
                }
                Err(existing) => {
                    ctx.error(
                        BuildError::DuplicateId {
                            id: item.id.clone(),
                            first: ctx.display_path(&existing.source_file()),
                            second: source_file.clone(),
                        },
                        Some(SourceLocation::file(source_file)),
                    );
                    None
                }
            }
        }
        Err(err) => {
            ctx.error(err, Some(SourceLocation::file(source_file)));
            None
        }
    }
}

/// Load the authors map of a feed collection.
pub(crate) fn load_authors(
    storage: &dyn Storage,
    collection: &CollectionConfig,
    ctx: &mut BuildContext,
) -> Option<Arc<AuthorsMap>> {
    let CollectionOptions::Feed(feed) = &collection.options else {
        return None;
    };
    let path = feed.authors_map.as_ref()?;
    let parsed = storage
        .read(path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_yaml::from_str::<AuthorsMap>(&content)
                .map_err(|e| format!("invalid authors map: {e}"))
        });
    match parsed {
        Ok(map) => Some(Arc::new(map)),
        Err(message) => {
            let display = ctx.display_path(path);
            let err = BuildError::ScanError {
                path: display.clone(),
                message,
            };
            let location = Some(SourceLocation::file(display));
            if ctx.config().build.strict_scan {
                ctx.error(err, location);
            } else {
                ctx.warn(err, location);
            }
            None
        }
    }
}

/// Scan every collection and standalone page into a catalog.
///
/// # Errors
///
/// Returns [`Rejected`] on invalid metadata, duplicate ids, or scan failures
/// in strict mode.
pub fn load_catalog(storage: &dyn Storage, ctx: &mut BuildContext) -> Result<Catalog, Rejected> {
    let config = ctx.config_arc();

    let scans: Vec<_> = config
        .collections_resolved
        .par_iter()
        .map(|collection| storage.scan(&collection.source_dir))
        .collect();

    let mut catalog = Catalog::default();
    for (collection, scan) in config.collections_resolved.iter().zip(scans) {
        let authors = load_authors(storage, collection, ctx);
        if let Some(map) = &authors {
            catalog
                .authors
                .insert(collection.name.clone(), Arc::clone(map));
        }
        let origin = Origin::Collection {
            config: collection,
            authors: authors.as_deref(),
        };

        match scan {
            Ok(result) => {
                for failure in &result.failures {
                    let path = collection.source_dir.join(&failure.rel_path);
                    report_scan_failure(ctx, &path, &failure.error);
                }
                for doc in result.documents {
                    add_document(ctx, &mut catalog, &origin, doc);
                }
            }
            Err(e) => report_scan_failure(ctx, &collection.source_dir, &e),
        }

        tracing::info!(
            collection = %collection.name,
            kind = %collection.kind(),
            items = catalog.collection_items(&collection.name).count(),
            "Loaded collection"
        );
    }

    for page in &config.pages_resolved {
        let origin = Origin::Page {
            config: page,
            root: &config.root_dir,
        };
        match storage.load(&config.root_dir, &page.source) {
            Ok(doc) => {
                add_document(ctx, &mut catalog, &origin, doc);
            }
            Err(e) => report_scan_failure(ctx, &config.root_dir.join(&page.source), &e),
        }
    }

    ctx.checkpoint()?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use cartograph_config::{DocsOptions, FeedOptions};
    use cartograph_storage::FrontMatter;
    use pretty_assertions::assert_eq;

    use super::*;

    fn docs_config() -> CollectionConfig {
        CollectionConfig {
            name: "docs".to_owned(),
            source_dir: PathBuf::from("/site/docs"),
            route_base_path: "/".to_owned(),
            options: CollectionOptions::Docs(DocsOptions::default()),
        }
    }

    fn feed_config() -> CollectionConfig {
        CollectionConfig {
            name: "fieldnotes".to_owned(),
            source_dir: PathBuf::from("/site/fieldnotes"),
            route_base_path: "/fieldnotes".to_owned(),
            options: CollectionOptions::Feed(FeedOptions::default()),
        }
    }

    fn source(path: &str, fm: FrontMatter) -> SourceDocument {
        SourceDocument {
            rel_path: PathBuf::from(path),
            front_matter: fm,
            body: "Some words here, see [setup](setup.md).\n".to_owned(),
            body_line: 1,
            title: "Title".to_owned(),
        }
    }

    fn build(config: &CollectionConfig, doc: SourceDocument) -> Result<ContentItem, BuildError> {
        Origin::Collection {
            config,
            authors: None,
        }
        .build_item(doc)
    }

    #[test]
    fn test_docs_id_and_slug() {
        let config = docs_config();

        let item = build(&config, source("core/index.md", FrontMatter::default())).unwrap();
        assert_eq!(item.id, ContentId::new("docs", "core/index"));
        assert_eq!(item.canonical_slug, "/core");
        assert_eq!(item.kind, ItemKind::Doc);
        assert_eq!(item.word_count, 5);
        assert_eq!(item.cross_refs[0].target, "setup.md");

        let root = build(&config, source("index.mdx", FrontMatter::default())).unwrap();
        assert_eq!(root.canonical_slug, "/");
    }

    #[test]
    fn test_docs_front_matter_id_and_slug() {
        let config = docs_config();
        let fm = FrontMatter {
            id: Some("start".to_owned()),
            slug: Some("getting-started".to_owned()),
            ..FrontMatter::default()
        };

        let item = build(&config, source("core/intro.md", fm)).unwrap();
        assert_eq!(item.id.id, "core/start");
        assert_eq!(item.canonical_slug, "/core/getting-started");

        let absolute = FrontMatter {
            slug: Some("/start".to_owned()),
            ..FrontMatter::default()
        };
        let item = build(&config, source("core/intro.md", absolute)).unwrap();
        assert_eq!(item.canonical_slug, "/start");
    }

    #[test]
    fn test_front_matter_id_with_slash_rejected() {
        let fm = FrontMatter {
            id: Some("a/b".to_owned()),
            ..FrontMatter::default()
        };
        let err = build(&docs_config(), source("core/intro.md", fm)).unwrap_err();
        assert_eq!(err.code(), "invalid-metadata");
    }

    #[test]
    fn test_feed_date_from_file_name() {
        let item = build(
            &feed_config(),
            source("2024-03-01-launch.md", FrontMatter::default()),
        )
        .unwrap();

        assert_eq!(item.id, ContentId::new("fieldnotes", "2024-03-01-launch"));
        assert_eq!(item.kind, ItemKind::Post);
        assert_eq!(item.metadata.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(item.canonical_slug, "/2024/03/01/launch");
    }

    #[test]
    fn test_feed_folder_post_and_front_matter_date() {
        let fm = FrontMatter {
            date: Some("2023-12-24T18:00:00Z".to_owned()),
            ..FrontMatter::default()
        };
        let item = build(&feed_config(), source("winter-update/index.md", fm)).unwrap();

        assert_eq!(item.id.id, "winter-update");
        assert_eq!(item.canonical_slug, "/2023/12/24/winter-update");
    }

    #[test]
    fn test_feed_slug_override() {
        let fm = FrontMatter {
            slug: Some("hello".to_owned()),
            ..FrontMatter::default()
        };
        let item = build(&feed_config(), source("2024-03-01-launch.md", fm)).unwrap();
        assert_eq!(item.canonical_slug, "/hello");
    }

    #[test]
    fn test_feed_post_without_date_rejected() {
        let err = build(&feed_config(), source("launch.md", FrontMatter::default())).unwrap_err();
        assert!(matches!(err, BuildError::InvalidMetadata { .. }));
        assert!(err.to_string().contains("no `date`"));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        let err = build(
            &feed_config(),
            source("2024-13-45-launch.md", FrontMatter::default()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a valid date"));

        let fm = FrontMatter {
            date: Some("yesterday".to_owned()),
            ..FrontMatter::default()
        };
        let err = build(&docs_config(), source("core/intro.md", fm)).unwrap_err();
        assert!(err.to_string().contains("unparseable date"));
    }

    #[test]
    fn test_unknown_author_rejected() {
        let config = feed_config();
        let authors: AuthorsMap = serde_yaml::from_str("ada:\n  name: Ada\n").unwrap();
        let fm = FrontMatter {
            authors: vec!["ada".to_owned(), "bob".to_owned()],
            ..FrontMatter::default()
        };

        let err = Origin::Collection {
            config: &config,
            authors: Some(&authors),
        }
        .build_item(source("2024-03-01-launch.md", fm))
        .unwrap_err();

        assert!(err.to_string().contains("unknown author `bob`"));
    }

    #[test]
    fn test_page_item() {
        let page = PageConfig {
            path: "/about".to_owned(),
            source: PathBuf::from("pages/about.md"),
        };
        let item = Origin::Page {
            config: &page,
            root: Path::new("/site"),
        }
        .build_item(source("pages/about.md", FrontMatter::default()))
        .unwrap();

        assert_eq!(item.id, ContentId::new("pages", "pages/about"));
        assert_eq!(item.canonical_slug, "/about");
        assert_eq!(item.source_file(), PathBuf::from("/site/pages/about.md"));
    }

    #[test]
    fn test_tags_trimmed_and_deduplicated() {
        let fm = FrontMatter {
            tags: vec![" rust ".to_owned(), "rust".to_owned(), String::new(), "cli".to_owned()],
            ..FrontMatter::default()
        };
        let item = build(&docs_config(), source("a.md", fm)).unwrap();
        assert_eq!(item.metadata.tags, vec!["rust".to_owned(), "cli".to_owned()]);
    }

    #[test]
    fn test_catalog_insert_and_remove() {
        let config = docs_config();
        let mut catalog = Catalog::default();
        let item = Arc::new(build(&config, source("a.md", FrontMatter::default())).unwrap());

        catalog.insert(Arc::clone(&item)).unwrap();
        let dup = catalog.insert(Arc::clone(&item)).unwrap_err();
        assert!(Arc::ptr_eq(&dup, &item));
        assert!(catalog.by_source("docs", Path::new("a.md")).is_some());

        let removed = catalog.remove_source("docs", Path::new("a.md")).unwrap();
        assert!(Arc::ptr_eq(&removed, &item));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(parse_date("2024-03-01"), expected);
        assert_eq!(parse_date("2024-03-01 09:30:00"), expected);
        assert_eq!(parse_date("2024-03-01T09:30:00+02:00"), expected);
        assert_eq!(parse_date("03/01/2024"), None);
    }
}
