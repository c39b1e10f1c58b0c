//! Site map assembly.
//!
//! The [`SiteMap`] is the immutable result of one successful build: the
//! route table, one navigation tree per section, the previous/next sibling
//! index and resolved navbar/footer links. It holds `Arc`s to the build's
//! catalog, routes and trees; labels, paths and summaries are resolved from
//! them when read or serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use cartograph_config::{CollectionOptions, Config, LinkItem};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::context::{BuildContext, Rejected};
use crate::diagnostics::BuildError;
use crate::links::{is_external, resolve_nav_href, route_base};
use crate::navigation::{NavNode, NavNodeId, NavTree, SectionKind};
use crate::registry::{Catalog, ContentId, ContentItem, ItemKind};
use crate::routes::{RouteEntry, RouteTable, RouteTarget};
use crate::slug::{join_route, strip_fragment};

const WORDS_PER_MINUTE: usize = 200;

/// Consumed capability that turns a content item into a document.
pub trait Renderer {
    /// Rendered output.
    type Document;
    /// Render failure.
    type Error;

    /// Render one item.
    fn render(&self, item: &ContentItem) -> Result<Self::Document, Self::Error>;
}

/// Previous/next neighbours of an item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SiblingLinks {
    pub prev: Option<ContentId>,
    pub next: Option<ContentId>,
}

/// Resolved navbar or footer link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub label: String,
    /// Final URL, `site.base_url` included for internal targets.
    pub href: String,
    pub external: bool,
}

impl ResolvedLink {
    fn resolve(item: &LinkItem, base_url: &str) -> Self {
        match (&item.to, &item.href) {
            (Some(to), _) => Self {
                label: item.label.clone(),
                href: join_route(&[base_url, to]),
                external: false,
            },
            (None, href) => Self {
                label: item.label.clone(),
                href: href.clone().unwrap_or_default(),
                external: true,
            },
        }
    }
}

/// Titled group of footer links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub title: String,
    pub items: Vec<ResolvedLink>,
}

/// Author of a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// What a page shell needs to know about an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub title: String,
    pub path: String,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_minutes: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorSummary>,
}

/// Reading time in minutes, at least one.
#[must_use]
pub fn reading_minutes(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Final merged and validated site map of one build.
#[derive(Debug)]
pub struct SiteMap {
    config: Arc<Config>,
    catalog: Arc<Catalog>,
    routes: Arc<RouteTable>,
    trees: Vec<Arc<NavTree>>,
    siblings: BTreeMap<ContentId, SiblingLinks>,
    navbar: Vec<ResolvedLink>,
    footer: Vec<ResolvedColumn>,
}

impl SiteMap {
    /// Route at a path.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<&Arc<RouteEntry>> {
        self.routes.get(path)
    }

    #[must_use]
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Navigation sections ordered by name.
    #[must_use]
    pub fn sections(&self) -> &[Arc<NavTree>] {
        &self.trees
    }

    /// Navigation tree of one section.
    #[must_use]
    pub fn navigation(&self, section: &str) -> Option<&Arc<NavTree>> {
        self.trees.iter().find(|t| t.name == section)
    }

    /// Previous/next neighbours of an item.
    #[must_use]
    pub fn siblings(&self, id: &ContentId) -> Option<&SiblingLinks> {
        self.siblings.get(id)
    }

    #[must_use]
    pub fn navbar(&self) -> &[ResolvedLink] {
        &self.navbar
    }

    #[must_use]
    pub fn footer(&self) -> &[ResolvedColumn] {
        &self.footer
    }

    /// Label a navigation doc node displays.
    #[must_use]
    pub fn doc_label<'a>(&'a self, content: &ContentId, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or_else(|| self.catalog.lookup(content).map(|item| item.nav_label()))
            .unwrap_or_default()
    }

    /// Summary of a routed item.
    #[must_use]
    pub fn content(&self, id: &ContentId) -> Option<ContentSummary> {
        let item = self.catalog.lookup(id)?;
        let path = self.routes.path_of(id)?;
        Some(self.summarize(item, path))
    }

    /// Render the item served at `path`.
    ///
    /// Returns `None` when the path does not serve a content item.
    pub fn render<R: Renderer>(
        &self,
        renderer: &R,
        path: &str,
    ) -> Option<Result<R::Document, R::Error>> {
        let RouteTarget::Content { id } = &self.routes.get(path)?.target else {
            return None;
        };
        let item = self.catalog.lookup(id)?;
        Some(renderer.render(item))
    }

    /// Pretty JSON serialization; identical input yields identical bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn summarize(&self, item: &ContentItem, path: &str) -> ContentSummary {
        let collection = self.config.collection(&item.id.collection);
        let edit_url = match collection.map(|c| &c.options) {
            Some(CollectionOptions::Docs(docs)) => docs.edit_url.as_ref().map(|base| {
                let source = item.source_file();
                let rel = source
                    .strip_prefix(&self.config.root_dir)
                    .unwrap_or(&item.source_path);
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("{}/{rel}", base.trim_end_matches('/'))
            }),
            _ => None,
        };
        let reading = match collection.map(|c| &c.options) {
            Some(CollectionOptions::Feed(feed)) if feed.show_reading_time => {
                Some(reading_minutes(item.word_count))
            }
            _ => None,
        };
        let authors_map = self.catalog.authors(&item.id.collection);
        let authors = item
            .metadata
            .authors
            .iter()
            .map(|key| {
                let author = authors_map.and_then(|m| m.get(key));
                AuthorSummary {
                    key: key.clone(),
                    name: author.map_or_else(|| key.clone(), |a| a.name.clone()),
                    title: author.and_then(|a| a.title.clone()),
                    url: author.and_then(|a| a.url.clone()),
                }
            })
            .collect();

        ContentSummary {
            title: item.metadata.title.clone(),
            path: path.to_owned(),
            kind: item.kind,
            description: item.metadata.description.clone(),
            edit_url,
            reading_minutes: reading,
            tags: item.metadata.tags.clone(),
            date: item.metadata.date,
            authors,
        }
    }

    fn node_view<'a>(&'a self, node: &'a NavNode, route_base: &str) -> NodeView<'a> {
        match node {
            NavNode::Doc { id, content, label } => NodeView::Doc {
                id,
                content_id: content,
                label: self.doc_label(content, label.as_deref()),
                path: self.routes.path_of(content),
            },
            NavNode::Category {
                id,
                label,
                collapsed,
                generated_index,
                children,
            } => NodeView::Category {
                id,
                label,
                collapsed: *collapsed,
                generated_index: *generated_index,
                path: self.routes.path_of_node(id),
                children: children
                    .iter()
                    .map(|c| self.node_view(c, route_base))
                    .collect(),
            },
            NavNode::Link { id, label, href } => NodeView::Link {
                id,
                label,
                href: if !is_external(href) && !strip_fragment(href).is_empty() {
                    resolve_nav_href(href, route_base, &self.config.site.base_url)
                } else {
                    href.clone()
                },
            },
            NavNode::Divider { id } => NodeView::Divider { id },
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NodeView<'a> {
    #[serde(rename_all = "camelCase")]
    Doc {
        id: &'a NavNodeId,
        content_id: &'a ContentId,
        label: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<&'a str>,
    },
    #[serde(rename_all = "camelCase")]
    Category {
        id: &'a NavNodeId,
        label: &'a str,
        collapsed: bool,
        generated_index: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<&'a str>,
        children: Vec<NodeView<'a>>,
    },
    Link {
        id: &'a NavNodeId,
        label: &'a str,
        href: String,
    },
    Divider {
        id: &'a NavNodeId,
    },
}

#[derive(Serialize)]
struct SectionView<'a> {
    kind: SectionKind,
    collection: &'a str,
    root: NodeView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteView<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    url: &'a str,
    base_url: &'a str,
    locale: &'a str,
}

impl Serialize for SiteMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct View<'a> {
            site: SiteView<'a>,
            routes: BTreeMap<&'a str, &'a RouteEntry>,
            navigation_by_section: BTreeMap<&'a str, SectionView<'a>>,
            sibling_index: &'a BTreeMap<ContentId, SiblingLinks>,
            content: BTreeMap<&'a ContentId, ContentSummary>,
            navbar: &'a [ResolvedLink],
            footer: &'a [ResolvedColumn],
        }

        let site = &self.config.site;
        View {
            site: SiteView {
                title: &site.title,
                url: &site.url,
                base_url: &site.base_url,
                locale: &site.locale,
            },
            routes: self
                .routes
                .entries()
                .map(|e| (e.path.as_str(), e.as_ref()))
                .collect(),
            navigation_by_section: self
                .trees
                .iter()
                .map(|t| {
                    let base = route_base(&self.config, &t.collection);
                    (
                        t.name.as_str(),
                        SectionView {
                            kind: t.kind,
                            collection: &t.collection,
                            root: self.node_view(&t.root, base),
                        },
                    )
                })
                .collect(),
            sibling_index: &self.siblings,
            content: self
                .catalog
                .items()
                .filter_map(|item| {
                    let path = self.routes.path_of(&item.id)?;
                    Some((&item.id, self.summarize(item, path)))
                })
                .collect(),
            navbar: &self.navbar,
            footer: &self.footer,
        }
        .serialize(serializer)
    }
}

/// Sort key of a doc among its siblings: explicit order first, then
/// declaration order, then id.
fn sibling_order(
    catalog: &Catalog,
    declared: usize,
    id: &ContentId,
) -> (bool, Option<f64>, usize) {
    let order = catalog.lookup(id).and_then(|item| item.metadata.order);
    (order.is_none(), order, declared)
}

/// Build the previous/next index.
///
/// Within each category the direct doc children are ordered by
/// [`sibling_order`] and adjacent ones linked. An item keeps the links of its
/// first occurrence. Feed posts are linked chronologically, newer first.
fn sibling_index(
    catalog: &Catalog,
    trees: &[Arc<NavTree>],
    config: &Config,
    preview: bool,
) -> BTreeMap<ContentId, SiblingLinks> {
    let mut index = BTreeMap::new();
    let mut link = |ordered: &[&ContentId]| {
        for (i, id) in ordered.iter().enumerate() {
            if index.contains_key(*id) {
                continue;
            }
            let prev = i.checked_sub(1).map(|j| ordered[j].clone());
            let next = ordered.get(i + 1).map(|n| (*n).clone());
            index.insert((*id).clone(), SiblingLinks { prev, next });
        }
    };

    for tree in trees.iter().filter(|t| t.kind == SectionKind::Sidebar) {
        tree.root.visit(&mut |node| {
            let NavNode::Category { children, .. } = node else {
                return;
            };
            let mut docs: Vec<(usize, &ContentId)> = children
                .iter()
                .filter_map(|child| match child {
                    NavNode::Doc { content, .. } => Some(content),
                    _ => None,
                })
                .enumerate()
                .collect();
            docs.sort_by(|(da, a), (db, b)| {
                let (ka, kb) = (sibling_order(catalog, *da, a), sibling_order(catalog, *db, b));
                ka.0.cmp(&kb.0)
                    .then_with(|| match (ka.1, kb.1) {
                        (Some(x), Some(y)) => x.total_cmp(&y),
                        _ => std::cmp::Ordering::Equal,
                    })
                    .then_with(|| ka.2.cmp(&kb.2))
                    .then_with(|| a.cmp(b))
            });
            let ordered: Vec<&ContentId> = docs.into_iter().map(|(_, id)| id).collect();
            link(&ordered);
        });
    }

    for collection in &config.collections_resolved {
        if let CollectionOptions::Feed(_) = collection.options {
            let posts = catalog.posts_newest_first(&collection.name, preview);
            let ordered: Vec<&ContentId> = posts.iter().map(|p| &p.id).collect();
            link(&ordered);
        }
    }

    index
}

/// Check the invariants every site map must satisfy.
fn check_invariants(trees: &[Arc<NavTree>], routes: &RouteTable) -> Vec<String> {
    let mut violations = Vec::new();

    for tree in trees {
        for (node, content) in tree.doc_refs() {
            if routes.path_of(content).is_none() {
                violations.push(format!(
                    "navigation node `{node}` references `{content}`, which has no route"
                ));
            }
        }
    }

    for entry in routes.entries() {
        if let RouteTarget::Content { id } = &entry.target
            && routes.path_of(id) != Some(entry.path.as_str())
        {
            violations.push(format!("route `{}` is not indexed for `{id}`", entry.path));
        }
    }
    if routes.content_count()
        != routes
            .entries()
            .filter(|e| matches!(e.target, RouteTarget::Content { .. }))
            .count()
    {
        violations.push("content index and route table disagree".to_owned());
    }

    violations
}

/// Merge the build's results into a site map.
///
/// # Errors
///
/// Returns [`Rejected`] with [`BuildError::AssemblyInvariantViolation`]
/// diagnostics when the inputs are inconsistent.
pub fn assemble(
    catalog: Arc<Catalog>,
    routes: Arc<RouteTable>,
    trees: Vec<Arc<NavTree>>,
    ctx: &mut BuildContext,
) -> Result<SiteMap, Rejected> {
    for message in check_invariants(&trees, &routes) {
        ctx.error(BuildError::AssemblyInvariantViolation { message }, None);
    }
    ctx.checkpoint()?;

    let config = ctx.config_arc();
    let siblings = sibling_index(&catalog, &trees, &config, ctx.preview());
    let base_url = config.site.base_url.as_str();
    let navbar = config
        .navbar
        .iter()
        .map(|item| ResolvedLink::resolve(item, base_url))
        .collect();
    let footer = config
        .footer
        .iter()
        .map(|column| ResolvedColumn {
            title: column.title.clone(),
            items: column
                .items
                .iter()
                .map(|item| ResolvedLink::resolve(item, base_url))
                .collect(),
        })
        .collect();

    tracing::info!(
        routes = routes.len(),
        sections = trees.len(),
        "Assembled site map"
    );
    Ok(SiteMap {
        config,
        catalog,
        routes,
        trees,
        siblings,
        navbar,
        footer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_minutes() {
        assert_eq!(reading_minutes(0), 1);
        assert_eq!(reading_minutes(200), 1);
        assert_eq!(reading_minutes(201), 2);
        assert_eq!(reading_minutes(1000), 5);
    }

    #[test]
    fn test_resolved_links() {
        let internal = LinkItem {
            label: "Core".to_owned(),
            to: Some("/core".to_owned()),
            href: None,
        };
        let external = LinkItem {
            label: "GitHub".to_owned(),
            to: None,
            href: Some("https://github.com/example".to_owned()),
        };

        let link = ResolvedLink::resolve(&internal, "/handbook/");
        assert_eq!(link.href, "/handbook/core");
        assert!(!link.external);

        let link = ResolvedLink::resolve(&external, "/handbook/");
        assert_eq!(link.href, "https://github.com/example");
        assert!(link.external);
    }

    #[test]
    fn test_invariants_hold_for_empty_inputs() {
        assert!(check_invariants(&[], &RouteTable::default()).is_empty());
    }

    #[test]
    fn test_nav_doc_without_route_violates_invariant() {
        let tree = NavTree {
            name: "main".to_owned(),
            collection: "docs".to_owned(),
            kind: SectionKind::Sidebar,
            source: None,
            root: NavNode::Category {
                id: NavNodeId::new("main"),
                label: "main".to_owned(),
                collapsed: false,
                generated_index: false,
                children: vec![NavNode::Doc {
                    id: NavNodeId::new("main[0]"),
                    content: ContentId::new("docs", "ghost"),
                    label: None,
                }],
            },
        };

        let violations = check_invariants(&[Arc::new(tree)], &RouteTable::default());
        assert_eq!(
            violations,
            vec!["navigation node `main[0]` references `docs:ghost`, which has no route".to_owned()]
        );
    }
}
