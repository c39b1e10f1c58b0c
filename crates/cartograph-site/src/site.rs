//! Long-lived site with incremental rebuilds.
//!
//! [`Site`] keeps the snapshot of the last successful build and applies
//! changed source paths to it. Readers get an `Arc<SiteMap>` that stays
//! valid while a rebuild runs; a successful rebuild swaps the snapshot
//! atomically.
//!
//! # Thread Safety
//!
//! - `Mutex<()>` serializes builds.
//! - `RwLock<Option<Arc<Snapshot>>>` holds the published snapshot.
//! - `Mutex<BTreeSet<PathBuf>>` holds changes not yet applied to a
//!   published snapshot. Tickets are issued under this lock, so publishing
//!   under it cannot race a newer request.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use cartograph_config::{CollectionOptions, Config};
use cartograph_storage::Storage;

use crate::build::{self, BuildOutcome, Halt, Snapshot};
use crate::context::{BuildContext, GenerationTicket, Generations};
use crate::sitemap::{Renderer, SiteMap};

/// A site that can be rebuilt incrementally.
pub struct Site {
    storage: Arc<dyn Storage>,
    config: Arc<Config>,
    generations: Generations,
    /// Serializes builds.
    rebuild_lock: Mutex<()>,
    current: RwLock<Option<Arc<Snapshot>>>,
    pending: Mutex<BTreeSet<PathBuf>>,
}

impl Site {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, config: Arc<Config>) -> Self {
        Self {
            storage,
            config,
            generations: Generations::default(),
            rebuild_lock: Mutex::new(()),
            current: RwLock::new(None),
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Latest generation requested.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generations.latest()
    }

    /// Site map of the last successful build.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn site_map(&self) -> Option<Arc<SiteMap>> {
        self.snapshot().map(|s| Arc::clone(&s.site_map))
    }

    /// Render the item served at `path` from the current site map.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn render<R: Renderer>(
        &self,
        renderer: &R,
        path: &str,
    ) -> Option<Result<R::Document, R::Error>> {
        self.site_map()?.render(renderer, path)
    }

    /// Files and directories whose changes affect the site.
    #[must_use]
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let config = &self.config;
        let mut paths = BTreeSet::new();
        for collection in &config.collections_resolved {
            paths.insert(collection.source_dir.clone());
            let extra = match &collection.options {
                CollectionOptions::Docs(docs) => docs.sidebars.as_ref(),
                CollectionOptions::Feed(feed) => feed.authors_map.as_ref(),
            };
            paths.extend(extra.cloned());
        }
        for page in &config.pages_resolved {
            paths.insert(config.root_dir.join(&page.source));
        }
        paths.into_iter().collect()
    }

    /// Build everything from scratch.
    ///
    /// Previous trees and routes are reused where equal. On success every
    /// pending change is considered applied.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn build(&self) -> BuildOutcome {
        let ticket = {
            let _pending = self.pending.lock().unwrap();
            self.generations.issue()
        };
        let _guard = self.rebuild_lock.lock().unwrap();
        if let Some(outcome) = superseded(&ticket) {
            return outcome;
        }
        let previous = self.snapshot();
        let mut ctx = BuildContext::new(Arc::clone(&self.config), ticket);
        let result = build::run_full(self.storage.as_ref(), &mut ctx, previous.as_deref());
        self.publish(result, &mut ctx, None)
    }

    /// Apply changed source paths.
    ///
    /// Changes are merged with those still pending from rejected or
    /// superseded rebuilds. Without a previous snapshot this is a full
    /// build. Requesting a rebuild supersedes every in-flight one.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn rebuild(&self, changes: impl IntoIterator<Item = PathBuf>) -> BuildOutcome {
        let (ticket, changes) = {
            let mut pending = self.pending.lock().unwrap();
            pending.extend(changes);
            (self.generations.issue(), pending.clone())
        };
        let _guard = self.rebuild_lock.lock().unwrap();
        if let Some(outcome) = superseded(&ticket) {
            return outcome;
        }
        tracing::debug!(
            generation = ticket.generation(),
            changes = changes.len(),
            "Rebuilding"
        );

        let previous = self.snapshot();
        let mut ctx = BuildContext::new(Arc::clone(&self.config), ticket);
        let storage = self.storage.as_ref();
        let result = match &previous {
            Some(previous) => build::run_incremental(storage, &mut ctx, previous, &changes),
            None => build::run_full(storage, &mut ctx, None),
        };
        self.publish(result, &mut ctx, Some(&changes))
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().unwrap().clone()
    }

    /// Publish a successful build unless a newer one was requested.
    ///
    /// `applied` is `None` for a full build, which applies every pending
    /// change.
    fn publish(
        &self,
        result: Result<Snapshot, Halt>,
        ctx: &mut BuildContext,
        applied: Option<&BTreeSet<PathBuf>>,
    ) -> BuildOutcome {
        let result = match result {
            Ok(snapshot) => {
                let mut pending = self.pending.lock().unwrap();
                if let Some(outcome) = superseded(ctx.ticket()) {
                    return outcome;
                }
                match applied {
                    Some(applied) => pending.retain(|path| !applied.contains(path)),
                    None => pending.clear(),
                }
                let site_map = Arc::clone(&snapshot.site_map);
                *self.current.write().unwrap() = Some(Arc::new(snapshot));
                Ok(site_map)
            }
            Err(Halt::Rejected(_)) if !ctx.ticket().is_current() => {
                Err(Halt::Superseded(ctx.ticket().generation()))
            }
            Err(halt) => Err(halt),
        };
        build::outcome(result, ctx)
    }
}

fn superseded(ticket: &GenerationTicket) -> Option<BuildOutcome> {
    (!ticket.is_current()).then(|| {
        tracing::debug!(generation = ticket.generation(), "Build superseded");
        BuildOutcome::Superseded {
            generation: ticket.generation(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use cartograph_storage::MockStorage;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Site: Send, Sync);

    fn site(storage: MockStorage) -> Site {
        let config = Config::from_toml_str(
            r#"
[[collections]]
name = "docs"
kind = "docs"
sidebars = "sidebars.yaml"

[[pages]]
path = "/about"
source = "pages/about.md"
"#,
            Path::new("/site"),
        )
        .unwrap();
        Site::new(Arc::new(storage), Arc::new(config))
    }

    #[test]
    fn test_watch_paths() {
        let site = site(MockStorage::new());
        assert_eq!(
            site.watch_paths(),
            vec![
                PathBuf::from("/site/docs"),
                PathBuf::from("/site/pages/about.md"),
                PathBuf::from("/site/sidebars.yaml"),
            ]
        );
    }

    #[test]
    fn test_first_rebuild_is_full_build() {
        let storage = MockStorage::new()
            .with_file("/site/docs/intro.md", "# Intro\n")
            .with_file("/site/pages/about.md", "# About\n")
            .with_file("/site/sidebars.yaml", "guide:\n  - intro\n");
        let site = site(storage);

        assert!(site.site_map().is_none());
        let outcome = site.rebuild([PathBuf::from("/site/docs/intro.md")]);

        assert!(outcome.is_assembled(), "{:?}", outcome.diagnostics());
        assert_eq!(site.generation(), 1);
        let site_map = site.site_map().unwrap();
        assert!(site_map.route("/intro").is_some());
        assert!(site_map.route("/about").is_some());
    }

    #[test]
    fn test_stale_ticket_is_superseded() {
        let generations = Generations::default();
        let stale = generations.issue();
        let _newer = generations.issue();

        let outcome = superseded(&stale).unwrap();
        assert!(matches!(outcome, BuildOutcome::Superseded { generation: 1 }));
    }
}
