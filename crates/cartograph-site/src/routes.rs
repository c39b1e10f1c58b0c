//! Route resolution.
//!
//! Maps every visible content item, generated category index, feed listing,
//! tag page and redirect to a normalized URL path. Path uniqueness is a hard
//! invariant: every second claim on a path is a [`BuildError::RouteCollision`]
//! and all of them are collected before the build is rejected.
//!
//! Entries are inserted in a fixed order (content, category indices, feed
//! listings, tag pages, redirects) so the reported "first" claimant is
//! deterministic.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use cartograph_config::{CollectionOptions, Config, PAGES_COLLECTION};
use serde::Serialize;

use crate::context::BuildContext;
use crate::diagnostics::{BuildError, SourceLocation};
use crate::navigation::{NavNode, NavNodeId, NavTree, SectionKind};
use crate::registry::{Catalog, ContentId, ItemKind};
use crate::slug::{join_route, slugify};

/// What a route serves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteTarget {
    /// A content item.
    Content { id: ContentId },
    /// Generated index page of a category.
    NavNode { id: NavNodeId },
    /// Page of a feed listing (1-based).
    FeedIndex { collection: String, page: usize },
    /// Tag overview (`tag = None`) or one tag of a feed.
    FeedTag {
        collection: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    },
    /// Redirect to another path.
    Redirect { to: String },
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content { id } => write!(f, "`{id}`"),
            Self::NavNode { id } => write!(f, "category index `{id}`"),
            Self::FeedIndex { collection, page } => {
                write!(f, "page {page} of the `{collection}` listing")
            }
            Self::FeedTag {
                collection,
                tag: None,
            } => write!(f, "the `{collection}` tag overview"),
            Self::FeedTag {
                collection,
                tag: Some(tag),
            } => write!(f, "tag `{tag}` of `{collection}`"),
            Self::Redirect { to } => write!(f, "redirect to `{to}`"),
        }
    }
}

/// Route classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Doc,
    Post,
    Page,
    Redirect,
}

impl From<ItemKind> for RouteKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Doc => Self::Doc,
            ItemKind::Post => Self::Post,
            ItemKind::Page => Self::Page,
        }
    }
}

/// One resolved route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// Normalized path, `site.base_url` included.
    pub path: String,
    /// What the route serves.
    pub target: RouteTarget,
    /// Locale tag.
    pub locale: String,
    /// Route classification.
    pub kind: RouteKind,
}

/// Unique path to route mapping.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: BTreeMap<String, Arc<RouteEntry>>,
    by_content: HashMap<ContentId, String>,
    by_node: HashMap<NavNodeId, String>,
}

impl RouteTable {
    /// Route at a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Arc<RouteEntry>> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Path of a content item.
    #[must_use]
    pub fn path_of(&self, id: &ContentId) -> Option<&str> {
        self.by_content.get(id).map(String::as_str)
    }

    /// Path of a generated category index.
    #[must_use]
    pub fn path_of_node(&self, id: &NavNodeId) -> Option<&str> {
        self.by_node.get(id).map(String::as_str)
    }

    /// Routes ordered by path.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of content items with a route.
    pub(crate) fn content_count(&self) -> usize {
        self.by_content.len()
    }
}

struct Resolver<'a> {
    table: RouteTable,
    previous: Option<&'a RouteTable>,
    locale: &'a str,
    collisions: Vec<BuildError>,
    reused: usize,
}

impl Resolver<'_> {
    fn insert(&mut self, path: String, target: RouteTarget, kind: RouteKind) {
        if let Some(existing) = self.table.entries.get(&path) {
            self.collisions.push(BuildError::RouteCollision {
                path,
                first: existing.target.clone(),
                second: target,
            });
            return;
        }

        match &target {
            RouteTarget::Content { id } => {
                self.table.by_content.insert(id.clone(), path.clone());
            }
            RouteTarget::NavNode { id } => {
                self.table.by_node.insert(id.clone(), path.clone());
            }
            _ => {}
        }

        let entry = match self.previous.and_then(|p| p.entries.get(&path)) {
            Some(prev)
                if prev.target == target && prev.kind == kind && prev.locale == self.locale =>
            {
                self.reused += 1;
                Arc::clone(prev)
            }
            _ => Arc::new(RouteEntry {
                path: path.clone(),
                target,
                locale: self.locale.to_owned(),
                kind,
            }),
        };
        self.table.entries.insert(path, entry);
    }
}

/// Route base of a collection (`/` for standalone pages).
pub(crate) fn route_base<'a>(config: &'a Config, collection: &str) -> &'a str {
    if collection == PAGES_COLLECTION {
        return "/";
    }
    config
        .collection(collection)
        .map_or("/", |c| c.route_base_path.as_str())
}

/// Build the route table.
///
/// Entries equal to one in `previous` are reused. Collisions are reported on
/// `ctx`; the returned table keeps the first claimant of each path.
pub fn resolve(
    catalog: &Catalog,
    trees: &[Arc<NavTree>],
    previous: Option<&RouteTable>,
    ctx: &mut BuildContext,
) -> RouteTable {
    let config = ctx.config_arc();
    let base_url = config.site.base_url.as_str();
    let preview = ctx.preview();
    let mut resolver = Resolver {
        table: RouteTable::default(),
        previous,
        locale: &config.site.locale,
        collisions: Vec::new(),
        reused: 0,
    };

    for item in catalog.items().filter(|item| item.is_visible(preview)) {
        let path = join_route(&[
            base_url,
            route_base(&config, &item.id.collection),
            &item.canonical_slug,
        ]);
        resolver.insert(
            path,
            RouteTarget::Content {
                id: item.id.clone(),
            },
            item.kind.into(),
        );
    }

    for tree in trees.iter().filter(|t| t.kind == SectionKind::Sidebar) {
        let docs_base = route_base(&config, &tree.collection);
        tree.root.visit(&mut |node| {
            if let NavNode::Category {
                id,
                label,
                generated_index: true,
                ..
            } = node
            {
                resolver.insert(
                    join_route(&[base_url, docs_base, "category", &slugify(label)]),
                    RouteTarget::NavNode { id: id.clone() },
                    RouteKind::Doc,
                );
            }
        });
    }

    let feeds: Vec<_> = config
        .collections_resolved
        .iter()
        .filter_map(|c| match &c.options {
            CollectionOptions::Feed(feed) => Some((c, feed)),
            CollectionOptions::Docs(_) => None,
        })
        .collect();

    for (collection, feed) in &feeds {
        let posts = catalog.posts_newest_first(&collection.name, preview).len();
        let pages = posts.div_ceil(feed.posts_per_page);
        for page in 1..=pages {
            let path = if page == 1 {
                join_route(&[base_url, &collection.route_base_path])
            } else {
                join_route(&[base_url, &collection.route_base_path, "page", &page.to_string()])
            };
            resolver.insert(
                path,
                RouteTarget::FeedIndex {
                    collection: collection.name.clone(),
                    page,
                },
                RouteKind::Page,
            );
        }
    }

    for (collection, _) in &feeds {
        let tags = tag_slugs(catalog, &collection.name, preview);
        if tags.is_empty() {
            continue;
        }
        resolver.insert(
            join_route(&[base_url, &collection.route_base_path, "tags"]),
            RouteTarget::FeedTag {
                collection: collection.name.clone(),
                tag: None,
            },
            RouteKind::Page,
        );
        for slug in tags.into_keys() {
            resolver.insert(
                join_route(&[base_url, &collection.route_base_path, "tags", &slug]),
                RouteTarget::FeedTag {
                    collection: collection.name.clone(),
                    tag: Some(slug),
                },
                RouteKind::Page,
            );
        }
    }

    for redirect in &config.redirects {
        resolver.insert(
            join_route(&[base_url, &redirect.from]),
            RouteTarget::Redirect {
                to: redirect.to.clone(),
            },
            RouteKind::Redirect,
        );
    }

    let Resolver {
        table,
        collisions,
        reused,
        ..
    } = resolver;
    let config_file = config.config_path.as_deref().map(|p| ctx.display_path(p));
    for collision in collisions {
        let location = route_claimant_location(&collision, catalog, config_file.as_deref(), ctx);
        ctx.error(collision, location);
    }
    tracing::info!(routes = table.len(), reused, "Resolved routes");
    table
}

/// Tag slug to the labels that produce it, for visible posts of a feed.
pub(crate) fn tag_slugs(
    catalog: &Catalog,
    collection: &str,
    preview: bool,
) -> BTreeMap<String, Vec<String>> {
    let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for post in catalog.posts_newest_first(collection, preview) {
        for tag in &post.metadata.tags {
            let slug = slugify(tag);
            if slug.is_empty() {
                continue;
            }
            let labels = tags.entry(slug).or_default();
            if !labels.contains(tag) {
                labels.push(tag.clone());
            }
        }
    }
    tags
}

/// Point a collision at the source of the second claimant.
fn route_claimant_location(
    collision: &BuildError,
    catalog: &Catalog,
    config_file: Option<&std::path::Path>,
    ctx: &BuildContext,
) -> Option<SourceLocation> {
    let BuildError::RouteCollision { second, .. } = collision else {
        return None;
    };
    match second {
        RouteTarget::Content { id } => catalog
            .lookup(id)
            .map(|item| SourceLocation::file(ctx.display_path(&item.source_file()))),
        RouteTarget::Redirect { .. } => config_file.map(SourceLocation::file),
        _ => None,
    }
}
