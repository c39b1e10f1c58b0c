//! Filesystem storage implementation.
//!
//! Provides [`FsStorage`] for reading content sources from the local
//! filesystem and watching them for changes.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use glob::Pattern;
use notify::{RecursiveMode, Watcher};

use crate::debouncer::EventDebouncer;
use crate::event::{StorageEventKind, StorageEventReceiver, WatchHandle};
use crate::scanner::{Scanner, is_source_dir};
use crate::storage::{
    ScanFailure, ScanResult, SourceDocument, Storage, StorageError, StorageErrorKind,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Quiet period before a change is reported.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// How often the drain thread checks for ready events and shutdown.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Content patterns for watched directories.
const CONTENT_PATTERNS: [&str; 2] = ["**/*.md", "**/*.mdx"];

/// Filesystem storage implementation.
///
/// Stateless: every scan reads the tree afresh. Incremental reuse is the
/// caller's concern.
pub struct FsStorage {
    content_patterns: Vec<Pattern>,
}

impl Default for FsStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FsStorage {
    /// Create a new filesystem storage.
    #[must_use]
    pub fn new() -> Self {
        let content_patterns = CONTENT_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { content_patterns }
    }

    /// Validate that a relative path doesn't escape its root.
    fn validate_path(path: &Path) -> Result<(), StorageError> {
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));

        if escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(())
    }
}

impl Storage for FsStorage {
    fn scan(&self, root: &Path) -> Result<ScanResult, StorageError> {
        let discovery = Scanner::new(root)
            .discover()
            .map_err(|e| StorageError::io(e, Some(root.to_path_buf())).with_backend(BACKEND))?;

        let mut result = ScanResult::default();
        for (rel_path, error) in discovery.failures {
            let full = root.join(&rel_path);
            result.failures.push(ScanFailure {
                rel_path,
                error: StorageError::io(error, Some(full)).with_backend(BACKEND),
            });
        }
        for rel_path in discovery.files {
            match self.load(root, &rel_path) {
                Ok(doc) => result.documents.push(doc),
                Err(error) => result.failures.push(ScanFailure { rel_path, error }),
            }
        }

        tracing::debug!(
            root = %root.display(),
            documents = result.documents.len(),
            failures = result.failures.len(),
            "Scanned content root"
        );
        Ok(result)
    }

    fn load(&self, root: &Path, rel_path: &Path) -> Result<SourceDocument, StorageError> {
        Self::validate_path(rel_path)?;
        let full_path = root.join(rel_path);
        let content = fs::read_to_string(&full_path)
            .map_err(|e| StorageError::io(e, Some(full_path)).with_backend(BACKEND))?;
        SourceDocument::parse(rel_path, &content).map_err(|e| e.with_backend(BACKEND))
    }

    fn read(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path)
            .map_err(|e| StorageError::io(e, Some(path.to_path_buf())).with_backend(BACKEND))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn watch(
        &self,
        roots: &[PathBuf],
    ) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let debouncer = Arc::new(EventDebouncer::new(DEBOUNCE));
        let filter = Arc::new(WatchFilter::new(roots, self.content_patterns.clone()));

        let mut watcher = notify::recommended_watcher({
            let debouncer = Arc::clone(&debouncer);
            let filter = Arc::clone(&filter);
            move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Filesystem watch error");
                        return;
                    }
                };
                let kind = match event.kind {
                    notify::EventKind::Create(_) => StorageEventKind::Created,
                    notify::EventKind::Modify(_) => StorageEventKind::Modified,
                    notify::EventKind::Remove(_) => StorageEventKind::Removed,
                    _ => return,
                };
                for path in event.paths {
                    if filter.accepts(&path) {
                        debouncer.record(path, kind);
                    }
                }
            }
        })
        .map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        for (target, mode) in filter.targets() {
            if !target.exists() {
                tracing::warn!(path = %target.display(), "Watch target does not exist, skipping");
                continue;
            }
            watcher.watch(&target, mode).map_err(|e| {
                StorageError::new(StorageErrorKind::Other)
                    .with_path(target.clone())
                    .with_backend(BACKEND)
                    .with_source(e)
            })?;
        }

        std::thread::spawn(move || {
            // The watcher stops delivering once dropped.
            let _watcher = watcher;
            loop {
                match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
                for event in debouncer.drain_ready() {
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((StorageEventReceiver::new(event_rx), WatchHandle::new(shutdown_tx)))
    }
}

/// Decides which raw filesystem events are relevant.
///
/// Directories are watched recursively for content files and for
/// subdirectories, so renaming or removing a folder is reported as one event
/// for its path. Individual files (sidebar specifications, authors maps, page
/// sources) are watched through their parent directory and matched exactly.
struct WatchFilter {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    patterns: Vec<Pattern>,
}

impl WatchFilter {
    fn new(roots: &[PathBuf], patterns: Vec<Pattern>) -> Self {
        let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
            roots.iter().cloned().partition(|p| p.is_dir());
        Self {
            dirs,
            files,
            patterns,
        }
    }

    fn targets(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut targets: Vec<(PathBuf, RecursiveMode)> = self
            .dirs
            .iter()
            .map(|d| (d.clone(), RecursiveMode::Recursive))
            .collect();
        for file in &self.files {
            let parent = file.parent().unwrap_or(Path::new(".")).to_path_buf();
            if !targets.iter().any(|(t, _)| *t == parent) {
                targets.push((parent, RecursiveMode::NonRecursive));
            }
        }
        targets
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.files.iter().any(|f| f == path) {
            return true;
        }
        self.dirs.iter().any(|dir| {
            path.strip_prefix(dir).is_ok_and(|rel| {
                self.patterns.iter().any(|p| p.matches_path(rel))
                    || (is_source_dir(rel) && Self::is_directory(path))
            })
        })
    }

    /// An existing directory, or a removed path that looks like one.
    fn is_directory(path: &Path) -> bool {
        path.is_dir() || (!path.exists() && path.extension().is_none())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fs_storage_is_send_sync() {
        assert_send_sync::<FsStorage>();
    }

    #[test]
    fn test_scan_collects_documents_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("core")).unwrap();
        fs::write(
            root.join("core/intro.md"),
            "---\ntitle: Introduction\nsidebar_position: 1\n---\n# Intro\n",
        )
        .unwrap();
        fs::write(root.join("core/setup.md"), "# Setting Up\n\nSteps.").unwrap();
        fs::write(root.join("core/broken.md"), "---\ntitle: [oops\n---\n").unwrap();

        let result = FsStorage::new().scan(root).unwrap();

        let titles: Vec<_> = result.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "Setting Up"]);
        assert_eq!(result.documents[0].front_matter.sidebar_position, Some(1.0));
        assert_eq!(result.documents[0].body_line, 5);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].rel_path, PathBuf::from("core/broken.md"));
        assert_eq!(result.failures[0].error.kind, StorageErrorKind::Malformed);
    }

    #[test]
    fn test_scan_missing_root_is_not_found() {
        let err = FsStorage::new()
            .scan(Path::new("/nonexistent/cartograph"))
            .unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::NotFound);
    }

    #[test]
    fn test_load_title_falls_back_to_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("core")).unwrap();
        fs::write(dir.path().join("core/index.md"), "No heading here.").unwrap();

        let doc = FsStorage::new()
            .load(dir.path(), Path::new("core/index.md"))
            .unwrap();

        assert_eq!(doc.title, "Core");
        assert_eq!(doc.body, "No heading here.");
    }

    #[test]
    fn test_load_rejects_escaping_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsStorage::new()
            .load(dir.path(), Path::new("../secret.md"))
            .unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[test]
    fn test_read_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidebars.yaml");
        fs::write(&path, "main: []").unwrap();

        let storage = FsStorage::new();
        assert!(storage.exists(&path));
        assert_eq!(storage.read(&path).unwrap(), "main: []");
        assert!(!storage.exists(&dir.path().join("missing.yaml")));
        assert_eq!(
            storage.read(&dir.path().join("missing.yaml")).unwrap_err().kind,
            StorageErrorKind::NotFound
        );
    }

    #[test]
    fn test_watch_filter_accepts() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        let sidebars = dir.path().join("sidebars.yaml");
        fs::write(&sidebars, "").unwrap();

        let filter = WatchFilter::new(
            &[docs.clone(), sidebars.clone()],
            FsStorage::new().content_patterns,
        );

        assert!(filter.accepts(&docs.join("intro.md")));
        assert!(filter.accepts(&docs.join("core/deep/page.mdx")));
        assert!(filter.accepts(&sidebars));
        assert!(!filter.accepts(&docs.join("logo.png")));
        assert!(!filter.accepts(&docs.join(".cache/entry")));
        assert!(!filter.accepts(&dir.path().join("build/sitemap.json")));
        assert_eq!(filter.targets().len(), 2);
    }

    #[test]
    fn test_watch_filter_accepts_directory_moves() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("concepts")).unwrap();
        fs::create_dir_all(docs.join("_drafts")).unwrap();

        let filter = WatchFilter::new(&[docs.clone()], FsStorage::new().content_patterns);

        assert!(filter.accepts(&docs.join("concepts")));
        assert!(filter.accepts(&docs.join("core")));
        assert!(!filter.accepts(&docs.join("_drafts")));
        assert!(!filter.accepts(&docs.join("removed.png")));
    }

    #[test]
    fn test_watch_reports_debounced_change() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();

        let storage = FsStorage::new();
        let (rx, handle) = storage.watch(std::slice::from_ref(&docs)).unwrap();

        // Give the watcher time to register.
        std::thread::sleep(Duration::from_millis(100));
        let file = docs.join("intro.md");
        fs::write(&file, "# Intro").unwrap();

        let event = rx.recv_timeout(Duration::from_secs(5));
        handle.stop();

        let event = event.expect("change event");
        assert!(event.path.ends_with("intro.md"));
    }
}
