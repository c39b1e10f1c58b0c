//! Build driver.
//!
//! Runs the stages in order (`Scanning → TreeBuilding → Resolving →
//! Validating → Assembling`) and stops at the first stage that reports an
//! error. Between stages the generation ticket is checked so a superseded
//! build stops early.
//!
//! Incremental builds start from the previous [`Snapshot`]: changed sources
//! are reloaded into a copy of the catalog, and trees and routes are reused
//! unless a change can affect them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cartograph_config::{CollectionOptions, Config};
use cartograph_storage::{Storage, StorageErrorKind, is_content_file, is_source_path};

use crate::context::{BuildContext, Rejected, Stage};
use crate::diagnostics::Diagnostic;
use crate::links;
use crate::navigation::{self, NavTree, SidebarSpecs};
use crate::registry::{self, AuthorsMap, Catalog, Origin};
use crate::routes::{self, RouteTable};
use crate::sitemap::{self, SiteMap};

/// Result of one build.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The site map was assembled.
    Assembled {
        site_map: Arc<SiteMap>,
        /// Warnings reported along the way.
        diagnostics: Vec<Diagnostic>,
    },
    /// A stage reported errors; no site map.
    Rejected(Rejected),
    /// A newer build was requested; output discarded.
    Superseded { generation: u64 },
}

impl BuildOutcome {
    #[must_use]
    pub fn site_map(&self) -> Option<&Arc<SiteMap>> {
        match self {
            Self::Assembled { site_map, .. } => Some(site_map),
            _ => None,
        }
    }

    /// Every diagnostic of the build.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Assembled { diagnostics, .. } => diagnostics,
            Self::Rejected(rejected) => &rejected.diagnostics,
            Self::Superseded { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_assembled(&self) -> bool {
        matches!(self, Self::Assembled { .. })
    }
}

/// Everything a successful build produced, kept for the next incremental
/// build.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub catalog: Arc<Catalog>,
    pub specs: SidebarSpecs,
    pub trees: Vec<Arc<NavTree>>,
    pub routes: Arc<RouteTable>,
    pub site_map: Arc<SiteMap>,
}

/// Why a build stopped.
#[derive(Debug)]
pub(crate) enum Halt {
    Rejected(Rejected),
    Superseded(u64),
}

impl From<Rejected> for Halt {
    fn from(rejected: Rejected) -> Self {
        Self::Rejected(rejected)
    }
}

fn ensure_current(ctx: &BuildContext) -> Result<(), Halt> {
    let ticket = ctx.ticket();
    if ticket.is_current() {
        Ok(())
    } else {
        tracing::info!(generation = ticket.generation(), stage = %ctx.stage(), "Build superseded");
        Err(Halt::Superseded(ticket.generation()))
    }
}

/// Stage boundary: reject on errors, stop when superseded.
fn boundary(ctx: &mut BuildContext) -> Result<(), Halt> {
    ctx.checkpoint()?;
    ensure_current(ctx)
}

/// Build a site from scratch.
///
/// Uses a private generation ticket, so the build is never superseded.
pub fn build(storage: &dyn Storage, config: Arc<Config>) -> BuildOutcome {
    let mut ctx = BuildContext::standalone(config);
    let result = run_full(storage, &mut ctx, None);
    outcome(result.map(|snapshot| snapshot.site_map), &mut ctx)
}

/// Convert a driver result into the public outcome.
pub(crate) fn outcome(result: Result<Arc<SiteMap>, Halt>, ctx: &mut BuildContext) -> BuildOutcome {
    match result {
        Ok(site_map) => {
            let diagnostics = ctx.take_diagnostics();
            tracing::info!(
                generation = ctx.ticket().generation(),
                routes = site_map.routes().len(),
                warnings = diagnostics.len(),
                "Build assembled"
            );
            BuildOutcome::Assembled {
                site_map,
                diagnostics,
            }
        }
        Err(Halt::Rejected(rejected)) => {
            tracing::info!(
                stage = %rejected.stage,
                errors = crate::diagnostics::error_count(&rejected.diagnostics),
                "Build rejected"
            );
            BuildOutcome::Rejected(rejected)
        }
        Err(Halt::Superseded(generation)) => BuildOutcome::Superseded { generation },
    }
}

/// Run every stage over a fresh scan. `previous` only enables reuse.
pub(crate) fn run_full(
    storage: &dyn Storage,
    ctx: &mut BuildContext,
    previous: Option<&Snapshot>,
) -> Result<Snapshot, Halt> {
    ctx.enter(Stage::Scanning);
    let catalog = Arc::new(registry::load_catalog(storage, ctx)?);
    ensure_current(ctx)?;

    ctx.enter(Stage::TreeBuilding);
    let specs = navigation::load_sidebar_specs(storage, ctx);
    compose(catalog, specs, previous, ctx)
}

/// Tree building onwards; the caller has entered [`Stage::TreeBuilding`].
fn compose(
    catalog: Arc<Catalog>,
    specs: SidebarSpecs,
    previous: Option<&Snapshot>,
    ctx: &mut BuildContext,
) -> Result<Snapshot, Halt> {
    let previous_trees = previous.map_or(&[][..], |p| p.trees.as_slice());
    let trees = navigation::build_trees(&catalog, &specs, previous_trees, ctx);
    boundary(ctx)?;

    ctx.enter(Stage::Resolving);
    let routes = routes::resolve(&catalog, &trees, previous.map(|p| p.routes.as_ref()), ctx);
    boundary(ctx)?;

    validate_and_assemble(catalog, specs, trees, Arc::new(routes), ctx)
}

fn validate_and_assemble(
    catalog: Arc<Catalog>,
    specs: SidebarSpecs,
    trees: Vec<Arc<NavTree>>,
    routes: Arc<RouteTable>,
    ctx: &mut BuildContext,
) -> Result<Snapshot, Halt> {
    ctx.enter(Stage::Validating);
    links::validate(&catalog, &trees, &routes, ctx);
    boundary(ctx)?;

    ctx.enter(Stage::Assembling);
    let site_map = sitemap::assemble(
        Arc::clone(&catalog),
        Arc::clone(&routes),
        trees.clone(),
        ctx,
    )?;
    Ok(Snapshot {
        catalog,
        specs,
        trees,
        routes,
        site_map: Arc::new(site_map),
    })
}

/// Which source a changed file belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SourceRef {
    Collection(usize),
    Page(usize),
}

#[derive(Debug, PartialEq, Eq)]
struct ItemChange {
    source: SourceRef,
    rel_path: PathBuf,
}

/// Effect of a set of changed files.
#[derive(Debug, Default, PartialEq, Eq)]
struct ChangePlan {
    items: Vec<ItemChange>,
    /// Docs collections whose sidebar file changed.
    sidebars: BTreeSet<String>,
}

/// Replace directory changes with the sources they cover.
///
/// A renamed, moved or removed folder arrives as the folder's path only. It
/// stands for every item previously loaded from below it plus whatever a scan
/// of it finds now.
fn expand_directories(
    storage: &dyn Storage,
    config: &Config,
    catalog: &Catalog,
    changes: &BTreeSet<PathBuf>,
) -> BTreeSet<PathBuf> {
    let mut expanded = changes.clone();
    for path in changes.iter().filter(|p| !is_content_file(p)) {
        expanded.extend(
            catalog
                .items()
                .map(|item| item.source_file())
                .filter(|file| file != path && file.starts_with(path)),
        );
        let in_collection = config
            .collections_resolved
            .iter()
            .any(|c| path.starts_with(&c.source_dir));
        if !in_collection || !storage.exists(path) {
            continue;
        }
        match storage.scan(path) {
            Ok(result) => {
                let found = result
                    .documents
                    .iter()
                    .map(|doc| &doc.rel_path)
                    .chain(result.failures.iter().map(|f| &f.rel_path));
                expanded.extend(found.map(|rel_path| path.join(rel_path)));
            }
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Not a source directory"),
        }
    }
    expanded
}

/// Classify changed files. `None` asks for a full rebuild.
fn plan_changes(config: &Config, changes: &BTreeSet<PathBuf>) -> Option<ChangePlan> {
    let mut plan = ChangePlan::default();
    for path in changes {
        for (i, collection) in config.collections_resolved.iter().enumerate() {
            match &collection.options {
                CollectionOptions::Feed(feed) if feed.authors_map.as_deref() == Some(path) => {
                    return None;
                }
                CollectionOptions::Docs(docs) if docs.sidebars.as_deref() == Some(path) => {
                    plan.sidebars.insert(collection.name.clone());
                }
                _ => {}
            }
            if let Ok(rel_path) = path.strip_prefix(&collection.source_dir)
                && is_source_path(rel_path)
            {
                plan.items.push(ItemChange {
                    source: SourceRef::Collection(i),
                    rel_path: rel_path.to_path_buf(),
                });
            }
        }
        for (i, page) in config.pages_resolved.iter().enumerate() {
            if config.root_dir.join(&page.source) == *path {
                plan.items.push(ItemChange {
                    source: SourceRef::Page(i),
                    rel_path: page.source.clone(),
                });
            }
        }
    }
    Some(plan)
}

/// Rebuild after `changes`, reusing as much of `previous` as possible.
pub(crate) fn run_incremental(
    storage: &dyn Storage,
    ctx: &mut BuildContext,
    previous: &Snapshot,
    changes: &BTreeSet<PathBuf>,
) -> Result<Snapshot, Halt> {
    let config = ctx.config_arc();
    let changes = &expand_directories(storage, &config, &previous.catalog, changes);
    let Some(plan) = plan_changes(&config, changes) else {
        tracing::info!("Authors map changed, rebuilding from scratch");
        return run_full(storage, ctx, Some(previous));
    };

    ctx.enter(Stage::Scanning);
    let mut catalog = Catalog::clone(&previous.catalog);
    let mut reroute = !plan.sidebars.is_empty();
    for change in &plan.items {
        let authors: Option<Arc<AuthorsMap>>;
        let origin = match change.source {
            SourceRef::Collection(i) => {
                let collection = &config.collections_resolved[i];
                authors = catalog.shared_authors(&collection.name);
                Origin::Collection {
                    config: collection,
                    authors: authors.as_deref(),
                }
            }
            SourceRef::Page(i) => Origin::Page {
                config: &config.pages_resolved[i],
                root: &config.root_dir,
            },
        };
        reroute |= reload(storage, ctx, &mut catalog, &origin, &change.rel_path);
    }
    boundary(ctx)?;
    let catalog = Arc::new(catalog);

    ctx.enter(Stage::TreeBuilding);
    let mut specs = previous.specs.clone();
    for name in &plan.sidebars {
        let path = config
            .collection(name)
            .and_then(navigation::sidebars_path);
        match path.and_then(|p| navigation::load_sidebar_spec(storage, p, ctx)) {
            Some(spec) => {
                specs.insert(name.clone(), spec);
            }
            None => {
                specs.remove(name);
            }
        }
    }

    if reroute {
        tracing::info!(changes = changes.len(), "Re-resolving routes");
        compose(catalog, specs, Some(previous), ctx)
    } else {
        tracing::info!(changes = changes.len(), "Reusing navigation trees and routes");
        boundary(ctx)?;
        validate_and_assemble(
            catalog,
            specs,
            previous.trees.clone(),
            Arc::clone(&previous.routes),
            ctx,
        )
    }
}

/// Reload one source into the catalog. Returns whether routes may change.
fn reload(
    storage: &dyn Storage,
    ctx: &mut BuildContext,
    catalog: &mut Catalog,
    origin: &Origin<'_>,
    rel_path: &Path,
) -> bool {
    let old = catalog.remove_source(origin.collection_name(), rel_path);
    match storage.load(origin.root(), rel_path) {
        Ok(doc) => match registry::add_document(ctx, catalog, origin, doc) {
            Some(new) => {
                tracing::debug!(id = %new.id, "Reloaded item");
                old.is_none_or(|old| !old.same_routing(&new))
            }
            None => true,
        },
        Err(e) if e.kind == StorageErrorKind::NotFound => {
            if let Some(old) = &old {
                tracing::debug!(id = %old.id, "Removed item");
            }
            old.is_some()
        }
        Err(e) => {
            registry::report_scan_failure(ctx, &origin.root().join(rel_path), &e);
            true
        }
    }
}
