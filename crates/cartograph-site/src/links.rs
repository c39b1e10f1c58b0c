//! Link integrity validation.
//!
//! Two classes of links are checked against the resolved route table:
//!
//! - navigation links: sidebar doc references and internal sidebar links,
//!   redirect targets, navbar and footer `to` targets
//!   (`[validation] nav_links`, error by default)
//! - cross references: links in content bodies, extracted with
//!   pulldown-cmark at scan time (`[validation] cross_references`, warn by
//!   default)
//!
//! Validation never mutates the route table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use cartograph_config::Config;
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use regex::Regex;

use crate::context::BuildContext;
use crate::diagnostics::{BuildError, SourceLocation};
use crate::navigation::{NavNode, NavTree};
use crate::registry::{Catalog, ContentId, ContentItem, CrossRef};
use crate::routes::RouteTable;
use crate::slug::{join_route, normalize_path, strip_fragment};

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("valid scheme regex"));

/// Whether a link target leaves the site (`https:`, `mailto:`, `//host`).
#[must_use]
pub fn is_external(target: &str) -> bool {
    target.starts_with("//") || SCHEME_RE.is_match(target)
}

/// Extract in-body links from markdown.
///
/// Images, external targets and pure anchors are skipped. `body_line` is the
/// line of the source file the body starts on.
#[must_use]
pub fn extract_cross_refs(body: &str, body_line: usize) -> Vec<CrossRef> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let mut refs = Vec::new();
    let mut line = body_line;
    let mut scanned = 0;
    for (event, range) in Parser::new_ext(body, options).into_offset_iter() {
        let Event::Start(Tag::Link {
            link_type,
            dest_url,
            ..
        }) = event
        else {
            continue;
        };
        if matches!(link_type, LinkType::Email)
            || dest_url.is_empty()
            || dest_url.starts_with('#')
            || is_external(&dest_url)
        {
            continue;
        }
        if range.start >= scanned {
            line += body[scanned..range.start].matches('\n').count();
            scanned = range.start;
        }
        refs.push(CrossRef {
            target: dest_url.into_string(),
            line,
        });
    }
    refs
}

/// Resolve a relative path against a base directory.
///
/// `..` never climbs above the root.
fn resolve_relative_path(relative: &str, base: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }
    segments.join("/")
}

fn is_markdown_target(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext == "md" || ext == "mdx")
}

/// Static asset links (`./diagram.png`) are not routes and are not checked.
fn is_asset_target(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    Path::new(last)
        .extension()
        .is_some_and(|ext| ext != "html")
}

/// Counts of checked links.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Navigation links checked.
    pub nav_links: usize,
    /// Cross references checked.
    pub cross_references: usize,
}

/// Check every navigation link and cross reference against the route table.
///
/// Problems are reported on `ctx` at the severity of the configured policy.
pub fn validate(
    catalog: &Catalog,
    trees: &[Arc<NavTree>],
    routes: &RouteTable,
    ctx: &mut BuildContext,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_nav_links(trees, routes, ctx, &mut report);
    validate_cross_references(catalog, routes, ctx, &mut report);
    tracing::info!(
        nav_links = report.nav_links,
        cross_references = report.cross_references,
        "Validated links"
    );
    report
}

fn validate_nav_links(
    trees: &[Arc<NavTree>],
    routes: &RouteTable,
    ctx: &mut BuildContext,
    report: &mut ValidationReport,
) {
    let config = ctx.config_arc();
    let policy = config.validation.nav_links;
    let base_url = config.site.base_url.as_str();

    let mut dangling: Vec<(BuildError, SourceLocation)> = Vec::new();
    let is_dangling =
        |target: &str| !routes.contains(&join_route(&[base_url, strip_fragment(target)]));

    for tree in trees {
        let file = tree
            .source
            .as_deref()
            .map_or_else(PathBuf::new, |p| ctx.display_path(p));
        let base = route_base(&config, &tree.collection);
        tree.root.visit(&mut |node| match node {
            NavNode::Doc { id, content, .. } => {
                report.nav_links += 1;
                if routes.path_of(content).is_none() {
                    dangling.push((
                        BuildError::DanglingNavLink {
                            target: content.to_string(),
                            location: id.to_string(),
                        },
                        SourceLocation::file(file.clone()).with_pointer(id.as_str()),
                    ));
                }
            }
            NavNode::Link { id, href, .. }
                if !is_external(href) && !strip_fragment(href).is_empty() =>
            {
                report.nav_links += 1;
                let route = resolve_nav_href(href, base, base_url);
                if !routes.contains(strip_fragment(&route)) {
                    dangling.push((
                        BuildError::DanglingNavLink {
                            target: href.clone(),
                            location: id.to_string(),
                        },
                        SourceLocation::file(file.clone()).with_pointer(id.as_str()),
                    ));
                }
            }
            _ => {}
        });
    }

    let config_file = config
        .config_path
        .as_deref()
        .map_or_else(|| PathBuf::from("cartograph.toml"), |p| ctx.display_path(p));
    let mut targets: Vec<(String, &str)> = Vec::new();
    for (i, redirect) in config.redirects.iter().enumerate() {
        if !is_external(&redirect.to) {
            targets.push((format!("redirects[{i}]"), &redirect.to));
        }
    }
    for (i, item) in config.navbar.iter().enumerate() {
        if let Some(to) = &item.to {
            targets.push((format!("navbar[{i}]"), to));
        }
    }
    for (i, column) in config.footer.iter().enumerate() {
        for (j, item) in column.items.iter().enumerate() {
            if let Some(to) = &item.to {
                targets.push((format!("footer[{i}].items[{j}]"), to));
            }
        }
    }
    for (pointer, target) in targets {
        report.nav_links += 1;
        if is_dangling(target) {
            dangling.push((
                BuildError::DanglingNavLink {
                    target: target.to_owned(),
                    location: pointer.clone(),
                },
                SourceLocation::file(config_file.clone()).with_pointer(pointer),
            ));
        }
    }

    for (error, location) in dangling {
        ctx.report_link(policy, error, Some(location));
    }
}

fn validate_cross_references(
    catalog: &Catalog,
    routes: &RouteTable,
    ctx: &mut BuildContext,
    report: &mut ValidationReport,
) {
    let policy = ctx.config().validation.cross_references;
    let base_url = ctx.config().site.base_url.clone();
    let by_file: HashMap<PathBuf, &ContentId> = catalog
        .items()
        .map(|item| (item.source_file(), &item.id))
        .collect();

    for item in catalog.items() {
        let Some(route) = routes.path_of(&item.id) else {
            continue;
        };
        for cross_ref in &item.cross_refs {
            let target = strip_fragment(&cross_ref.target);
            if target.is_empty() {
                continue;
            }
            let resolved = if is_markdown_target(target) {
                let file = resolve_source_link(item, target);
                by_file
                    .get(&file)
                    .is_some_and(|id| routes.path_of(id).is_some())
            } else if is_asset_target(target) {
                continue;
            } else {
                routes.contains(&resolve_url_link(route, target, &base_url))
            };

            report.cross_references += 1;
            if !resolved {
                let location = SourceLocation::file(ctx.display_path(&item.source_file()))
                    .with_line(cross_ref.line);
                ctx.report_link(
                    policy,
                    BuildError::DanglingCrossReference {
                        target: cross_ref.target.clone(),
                        from: item.id.clone(),
                    },
                    Some(location),
                );
            }
        }
    }
}

/// Source file a markdown link points at. Absolute targets are relative to
/// the item's collection root.
fn resolve_source_link(item: &ContentItem, target: &str) -> PathBuf {
    let base = if target.starts_with('/') {
        String::new()
    } else {
        item.source_path
            .parent()
            .map(|dir| dir.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    };
    item.source_root.join(resolve_relative_path(target, &base))
}

/// Route base a sidebar's relative links resolve against.
pub(crate) fn route_base<'a>(config: &'a Config, collection: &str) -> &'a str {
    config
        .collection(collection)
        .map_or("/", |c| c.route_base_path.as_str())
}

/// Site path of an internal sidebar link, fragment kept.
///
/// Absolute targets are site-relative. Relative targets resolve against the
/// route base of the sidebar's docs collection.
pub(crate) fn resolve_nav_href(href: &str, route_base: &str, base_url: &str) -> String {
    let target = strip_fragment(href);
    let suffix = &href[target.len()..];
    let path = if target.starts_with('/') {
        join_route(&[base_url, target])
    } else {
        join_route(&[base_url, &resolve_relative_path(target, route_base)])
    };
    format!("{path}{suffix}")
}

/// Route a URL link points at. Relative targets resolve against the
/// directory of the linking route.
fn resolve_url_link(route: &str, target: &str, base_url: &str) -> String {
    if target.starts_with('/') {
        return join_route(&[base_url, target]);
    }
    let dir = route.rsplit_once('/').map_or("", |(dir, _)| dir);
    normalize_path(&resolve_relative_path(target, dir))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_extract_cross_refs_skips_external_and_anchors() {
        let body = "\
Intro with [setup](setup.md#install) and [site](https://example.com).

![diagram](diagram.png)

See [above](#top), <https://rust-lang.org>, <ops@example.com>
and [core](/core) or [mail](mailto:ops@example.com).
";
        let refs = extract_cross_refs(body, 4);
        assert_eq!(
            refs,
            vec![
                CrossRef {
                    target: "setup.md#install".to_owned(),
                    line: 4,
                },
                CrossRef {
                    target: "/core".to_owned(),
                    line: 9,
                },
            ]
        );
    }

    #[test]
    fn test_extract_reference_style_links() {
        let body = "Read [the guide][guide].\n\n[guide]: ../guides/intro.md\n";
        let refs = extract_cross_refs(body, 1);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target, "../guides/intro.md");
        assert_eq!(refs[0].line, 1);
    }

    #[test]
    fn test_is_external() {
        assert!(is_external("https://example.com"));
        assert!(is_external("mailto:a@b.c"));
        assert!(is_external("//cdn.example.com/x.js"));
        assert!(!is_external("/core"));
        assert!(!is_external("setup.md"));
        assert!(!is_external("../core/setup.md"));
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(resolve_relative_path("setup.md", "core"), "core/setup.md");
        assert_eq!(resolve_relative_path("../intro.md", "core/deep"), "core/intro.md");
        assert_eq!(resolve_relative_path("../../../x.md", "core"), "x.md");
        assert_eq!(resolve_relative_path("./a/./b.md", ""), "a/b.md");
    }

    #[test]
    fn test_resolve_url_link() {
        assert_eq!(resolve_url_link("/core/intro", "setup", "/"), "/core/setup");
        assert_eq!(resolve_url_link("/core/intro", "../about", "/"), "/about");
        assert_eq!(resolve_url_link("/docs/core/intro", "/about/", "/docs/"), "/docs/about");
        assert_eq!(resolve_url_link("/", "core", "/"), "/core");
    }

    #[test]
    fn test_resolve_nav_href() {
        assert_eq!(resolve_nav_href("/core", "/", "/"), "/core");
        assert_eq!(resolve_nav_href("core/setup#install", "/", "/"), "/core/setup#install");
        assert_eq!(resolve_nav_href("./setup", "/guide", "/docs/"), "/docs/guide/setup");
        assert_eq!(resolve_nav_href("../fieldnotes", "/guide", "/"), "/fieldnotes");
        assert_eq!(resolve_nav_href("/about?tab=1", "/guide", "/docs/"), "/docs/about?tab=1");
    }

    #[test]
    fn test_asset_targets() {
        assert!(is_asset_target("./img/diagram.png"));
        assert!(is_asset_target("/files/spec.pdf"));
        assert!(!is_asset_target("../core/setup"));
        assert!(!is_asset_target("/legacy/index.html"));
        assert!(is_markdown_target("setup.mdx"));
        assert!(!is_markdown_target("setup.md.bak"));
    }
}
