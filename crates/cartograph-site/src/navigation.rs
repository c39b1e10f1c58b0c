//! Navigation tree builder.
//!
//! Turns parsed sidebar specifications into typed [`NavTree`]s, one per named
//! sidebar, plus one recent-posts section per feed collection. Doc labels are
//! not copied into the tree: they are resolved from the catalog when the site
//! map is read, so a title edit never changes a tree.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cartograph_config::{CollectionConfig, CollectionOptions, FeedOptions};
use cartograph_storage::Storage;
use serde::Serialize;

use crate::context::BuildContext;
use crate::diagnostics::{BuildError, SourceLocation};
use crate::registry::{Catalog, ContentId};
use crate::sidebar::{SidebarSpec, SpecItem, parse_sidebars};

/// Parsed sidebar specification per docs collection.
pub type SidebarSpecs = BTreeMap<String, Arc<SidebarSpec>>;

/// Identifier of a navigation node: its position in the specification
/// (`main[1].items[3]`). The root of a section is the section name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NavNodeId(String);

impl NavNodeId {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Navigation tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum NavNode {
    /// Reference to a content item.
    Doc {
        id: NavNodeId,
        content: ContentId,
        /// Explicit label from the specification.
        label: Option<String>,
    },
    /// Labelled group; never empty.
    Category {
        id: NavNodeId,
        label: String,
        collapsed: bool,
        generated_index: bool,
        children: Vec<NavNode>,
    },
    /// Internal or external link.
    Link {
        id: NavNodeId,
        label: String,
        href: String,
    },
    /// Visual separator.
    Divider { id: NavNodeId },
}

impl NavNode {
    #[must_use]
    pub fn id(&self) -> &NavNodeId {
        match self {
            Self::Doc { id, .. }
            | Self::Category { id, .. }
            | Self::Link { id, .. }
            | Self::Divider { id } => id,
        }
    }

    /// Visit this node and its descendants depth-first.
    pub fn visit<'a, F: FnMut(&'a NavNode)>(&'a self, f: &mut F) {
        f(self);
        if let Self::Category { children, .. } = self {
            for child in children {
                child.visit(f);
            }
        }
    }
}

/// Where a navigation section comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Named sidebar of a docs collection.
    Sidebar,
    /// Recent posts of a feed collection.
    Feed,
}

/// Navigation tree of one section.
#[derive(Clone, Debug, PartialEq)]
pub struct NavTree {
    /// Section name (sidebar name, or feed collection name).
    pub name: String,
    /// Collection the doc references resolve against.
    pub collection: String,
    /// Section origin.
    pub kind: SectionKind,
    /// Sidebar file the tree was parsed from.
    pub source: Option<PathBuf>,
    /// Root category labelled with the section name.
    pub root: NavNode,
}

impl NavTree {
    /// Doc references in depth-first order.
    #[must_use]
    pub fn doc_refs(&self) -> Vec<(&NavNodeId, &ContentId)> {
        let mut refs = Vec::new();
        self.root.visit(&mut |node| {
            if let NavNode::Doc { id, content, .. } = node {
                refs.push((id, content));
            }
        });
        refs
    }
}

/// Read and parse the sidebar file of one docs collection.
///
/// Problems are reported on `ctx`.
pub(crate) fn load_sidebar_spec(
    storage: &dyn Storage,
    path: &Path,
    ctx: &mut BuildContext,
) -> Option<Arc<SidebarSpec>> {
    let shown = ctx.display_path(path);
    let content = match storage.read(path) {
        Ok(content) => content,
        Err(e) => {
            ctx.error(
                BuildError::ScanError {
                    path: shown.clone(),
                    message: e.to_string(),
                },
                Some(SourceLocation::file(shown)),
            );
            return None;
        }
    };

    match parse_sidebars(&content, ctx.config().build.max_nav_depth) {
        Ok(spec) => {
            tracing::debug!(
                path = %shown.display(),
                sidebars = spec.sidebars.len(),
                "Parsed sidebar specification"
            );
            Some(Arc::new(spec))
        }
        Err(issues) => {
            for issue in issues {
                let location = issue.location(&shown);
                ctx.error(issue.error, Some(location));
            }
            None
        }
    }
}

/// Read every configured sidebar file.
pub fn load_sidebar_specs(storage: &dyn Storage, ctx: &mut BuildContext) -> SidebarSpecs {
    let config = ctx.config_arc();
    let mut specs = SidebarSpecs::new();
    for collection in &config.collections_resolved {
        if let Some(path) = sidebars_path(collection)
            && let Some(spec) = load_sidebar_spec(storage, path, ctx)
        {
            specs.insert(collection.name.clone(), spec);
        }
    }
    specs
}

/// Sidebar file of a docs collection.
pub(crate) fn sidebars_path(collection: &CollectionConfig) -> Option<&Path> {
    match &collection.options {
        CollectionOptions::Docs(docs) => docs.sidebars.as_deref(),
        CollectionOptions::Feed(_) => None,
    }
}

/// Build every navigation section.
///
/// Trees equal to one in `previous` are reused. The result is ordered by
/// section name. Problems are reported on `ctx`.
pub fn build_trees(
    catalog: &Catalog,
    specs: &SidebarSpecs,
    previous: &[Arc<NavTree>],
    ctx: &mut BuildContext,
) -> Vec<Arc<NavTree>> {
    let config = ctx.config_arc();
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut trees = Vec::new();

    for collection in &config.collections_resolved {
        match &collection.options {
            CollectionOptions::Docs(docs) => {
                let Some(spec) = specs.get(&collection.name) else {
                    continue;
                };
                let source = docs.sidebars.clone();
                for (name, items) in &spec.sidebars {
                    if !claim_section(&mut owners, name, collection, source.as_deref(), ctx) {
                        continue;
                    }
                    if let Some(tree) =
                        build_tree(name, &collection.name, items, source.clone(), catalog, ctx)
                    {
                        trees.push(tree);
                    }
                }
            }
            CollectionOptions::Feed(feed) => {
                if !claim_section(&mut owners, &collection.name, collection, None, ctx) {
                    continue;
                }
                if let Some(tree) = feed_section(&collection.name, feed, catalog, ctx.preview()) {
                    trees.push(tree);
                }
            }
        }
    }

    trees.sort_by(|a, b| a.name.cmp(&b.name));
    let mut reused = 0;
    let trees: Vec<_> = trees
        .into_iter()
        .map(|tree| match previous.iter().find(|p| p.name == tree.name) {
            Some(prev) if **prev == tree => {
                reused += 1;
                Arc::clone(prev)
            }
            _ => Arc::new(tree),
        })
        .collect();
    tracing::info!(sections = trees.len(), reused, "Built navigation trees");
    trees
}

/// Register a section name; reports a clash with another collection.
fn claim_section(
    owners: &mut HashMap<String, String>,
    name: &str,
    collection: &CollectionConfig,
    source: Option<&Path>,
    ctx: &mut BuildContext,
) -> bool {
    if let Some(owner) = owners.get(name) {
        let location = source.map(|p| SourceLocation::file(ctx.display_path(p)).with_pointer(name));
        ctx.error(
            BuildError::InvalidSidebar {
                location: name.to_owned(),
                message: format!(
                    "section name is used by both collection `{owner}` and collection `{}`",
                    collection.name
                ),
            },
            location,
        );
        return false;
    }
    owners.insert(name.to_owned(), collection.name.clone());
    true
}

/// Build the tree of one named sidebar.
///
/// Returns `None` when nothing is left after dropping drafts and pruning
/// empty categories.
pub fn build_tree(
    name: &str,
    collection: &str,
    items: &[SpecItem],
    source: Option<PathBuf>,
    catalog: &Catalog,
    ctx: &mut BuildContext,
) -> Option<NavTree> {
    let file = source
        .as_deref()
        .map_or_else(PathBuf::new, |p| ctx.display_path(p));
    let mut builder = TreeBuilder {
        collection,
        catalog,
        preview: ctx.preview(),
        file,
        seen: HashMap::new(),
    };
    let children = builder.nodes(items, ctx);

    if children.is_empty() {
        ctx.warn(
            BuildError::EmptyCategoryPruned {
                label: name.to_owned(),
                location: name.to_owned(),
            },
            Some(builder.location(name)),
        );
        return None;
    }

    Some(NavTree {
        name: name.to_owned(),
        collection: collection.to_owned(),
        kind: SectionKind::Sidebar,
        source,
        root: NavNode::Category {
            id: NavNodeId::new(name),
            label: name.to_owned(),
            collapsed: false,
            generated_index: false,
            children,
        },
    })
}

struct TreeBuilder<'a> {
    collection: &'a str,
    catalog: &'a Catalog,
    preview: bool,
    file: PathBuf,
    seen: HashMap<ContentId, String>,
}

impl TreeBuilder<'_> {
    fn location(&self, pointer: &str) -> SourceLocation {
        SourceLocation::file(self.file.clone()).with_pointer(pointer)
    }

    fn nodes(&mut self, items: &[SpecItem], ctx: &mut BuildContext) -> Vec<NavNode> {
        items.iter().filter_map(|item| self.node(item, ctx)).collect()
    }

    fn node(&mut self, item: &SpecItem, ctx: &mut BuildContext) -> Option<NavNode> {
        match item {
            SpecItem::Doc {
                id,
                label,
                location,
            } => {
                let content = ContentId::new(self.collection, id.as_str());
                let Some(target) = self.catalog.lookup(&content) else {
                    ctx.error(
                        BuildError::DanglingNavReference {
                            id: content,
                            location: location.clone(),
                        },
                        Some(self.location(location)),
                    );
                    return None;
                };
                if let Some(first) = self.seen.get(&content) {
                    ctx.error(
                        BuildError::DuplicateNavReference {
                            id: content,
                            first: first.clone(),
                            second: location.clone(),
                        },
                        Some(self.location(location)),
                    );
                    return None;
                }
                self.seen.insert(content.clone(), location.clone());
                if !target.is_visible(self.preview) {
                    ctx.warn(
                        BuildError::DraftNavReference {
                            id: content,
                            location: location.clone(),
                        },
                        Some(self.location(location)),
                    );
                    return None;
                }
                Some(NavNode::Doc {
                    id: NavNodeId::new(location.as_str()),
                    content,
                    label: label.clone(),
                })
            }
            SpecItem::Category {
                label,
                items,
                collapsed,
                generated_index,
                location,
            } => {
                let children = self.nodes(items, ctx);
                if children.is_empty() {
                    ctx.warn(
                        BuildError::EmptyCategoryPruned {
                            label: label.clone(),
                            location: location.clone(),
                        },
                        Some(self.location(location)),
                    );
                    return None;
                }
                Some(NavNode::Category {
                    id: NavNodeId::new(location.as_str()),
                    label: label.clone(),
                    collapsed: *collapsed,
                    generated_index: *generated_index,
                    children,
                })
            }
            SpecItem::Link {
                label,
                href,
                location,
            } => Some(NavNode::Link {
                id: NavNodeId::new(location.as_str()),
                label: label.clone(),
                href: href.clone(),
            }),
            SpecItem::Divider { location } => Some(NavNode::Divider {
                id: NavNodeId::new(location.as_str()),
            }),
        }
    }
}

/// Recent-posts section of a feed collection.
fn feed_section(
    collection: &str,
    feed: &FeedOptions,
    catalog: &Catalog,
    preview: bool,
) -> Option<NavTree> {
    let children: Vec<_> = catalog
        .posts_newest_first(collection, preview)
        .into_iter()
        .take(feed.sidebar_count)
        .enumerate()
        .map(|(i, post)| NavNode::Doc {
            id: NavNodeId::new(format!("{collection}[{i}]")),
            content: post.id.clone(),
            label: None,
        })
        .collect();
    if children.is_empty() {
        return None;
    }
    Some(NavTree {
        name: collection.to_owned(),
        collection: collection.to_owned(),
        kind: SectionKind::Feed,
        source: None,
        root: NavNode::Category {
            id: NavNodeId::new(collection),
            label: feed.sidebar_title.clone(),
            collapsed: false,
            generated_index: false,
            children,
        },
    })
}
