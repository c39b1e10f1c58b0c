//! Mock storage implementation for testing.
//!
//! Provides [`MockStorage`] for exercising the composition engine without
//! filesystem access.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, mpsc};

use crate::event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
use crate::storage::{
    ScanFailure, ScanResult, SourceDocument, Storage, StorageError, StorageErrorKind,
};
use crate::scanner::is_source_path;

const BACKEND: &str = "Mock";

/// In-memory storage for tests.
///
/// Files are keyed by absolute path. Builder methods populate the mock;
/// [`write_file`](Self::write_file) and [`remove_file`](Self::remove_file)
/// mutate it afterwards to simulate edits between builds.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use cartograph_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new()
///     .with_file("/site/docs/intro.md", "# Intro")
///     .with_file("/site/sidebars.yaml", "main: [intro]");
///
/// let result = storage.scan(Path::new("/site/docs")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockStorage {
    files: RwLock<BTreeMap<PathBuf, String>>,
    unreadable: RwLock<BTreeSet<PathBuf>>,
    event_sender: RwLock<Option<mpsc::Sender<StorageEvent>>>,
}

impl MockStorage {
    /// Create a new empty mock storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.write_file(path, content);
        self
    }

    /// Add a file that exists but cannot be read.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unreadable(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.files.write().unwrap().insert(path.clone(), String::new());
        self.unreadable.write().unwrap().insert(path);
        self
    }

    /// Create or replace a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn write_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into();
        self.unreadable.write().unwrap().remove(&path);
        self.files.write().unwrap().insert(path, content.into());
    }

    /// Remove a file. Returns whether it existed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_file(&self, path: &Path) -> bool {
        self.unreadable.write().unwrap().remove(path);
        self.files.write().unwrap().remove(path).is_some()
    }

    /// Emit a storage event.
    ///
    /// Only works if `watch()` has been called first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn emit(&self, path: impl Into<PathBuf>, kind: StorageEventKind) {
        if let Some(sender) = self.event_sender.read().unwrap().as_ref() {
            let _ = sender.send(StorageEvent::new(path, kind));
        }
    }

    fn unreadable_error(path: &Path) -> StorageError {
        StorageError::new(StorageErrorKind::PermissionDenied)
            .with_path(path)
            .with_backend(BACKEND)
    }
}

impl Storage for MockStorage {
    fn scan(&self, root: &Path) -> Result<ScanResult, StorageError> {
        let files = self.files.read().unwrap();
        let unreadable = self.unreadable.read().unwrap();

        let mut result = ScanResult::default();
        let mut found_any = false;
        for (path, content) in files.iter() {
            let Ok(rel_path) = path.strip_prefix(root) else {
                continue;
            };
            found_any = true;
            if !is_source_path(rel_path) {
                continue;
            }
            let loaded = if unreadable.contains(path) {
                Err(Self::unreadable_error(path))
            } else {
                SourceDocument::parse(rel_path, content).map_err(|e| e.with_backend(BACKEND))
            };
            match loaded {
                Ok(doc) => result.documents.push(doc),
                Err(error) => result.failures.push(ScanFailure {
                    rel_path: rel_path.to_path_buf(),
                    error,
                }),
            }
        }

        if !found_any {
            return Err(StorageError::not_found(root).with_backend(BACKEND));
        }
        Ok(result)
    }

    fn load(&self, root: &Path, rel_path: &Path) -> Result<SourceDocument, StorageError> {
        let path = root.join(rel_path);
        if self.unreadable.read().unwrap().contains(&path) {
            return Err(Self::unreadable_error(&path));
        }
        let content = self.read(&path)?;
        SourceDocument::parse(rel_path, &content).map_err(|e| e.with_backend(BACKEND))
    }

    fn read(&self, path: &Path) -> Result<String, StorageError> {
        if self.unreadable.read().unwrap().contains(path) {
            return Err(Self::unreadable_error(path));
        }
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path).with_backend(BACKEND))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().keys().any(|file| file.starts_with(path))
    }

    fn watch(
        &self,
        _roots: &[PathBuf],
    ) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (tx, rx) = mpsc::channel();
        *self.event_sender.write().unwrap() = Some(tx);
        Ok((StorageEventReceiver::new(rx), WatchHandle::no_op()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_mock_storage_is_send_sync() {
        assert_send_sync::<MockStorage>();
    }

    #[test]
    fn test_scan_filters_by_root_and_kind() {
        let storage = MockStorage::new()
            .with_file("/site/docs/intro.md", "# Intro")
            .with_file("/site/docs/core/setup.mdx", "---\ntitle: Setup\n---\n")
            .with_file("/site/docs/_partials/note.md", "partial")
            .with_file("/site/docs/logo.svg", "<svg/>")
            .with_file("/site/notes/hello.md", "# Hello");

        let result = storage.scan(Path::new("/site/docs")).unwrap();

        let paths: Vec<_> = result.documents.iter().map(|d| d.rel_path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("core/setup.mdx"), PathBuf::from("intro.md")]
        );
        assert_eq!(result.documents[0].title, "Setup");
    }

    #[test]
    fn test_scan_reports_failures() {
        let storage = MockStorage::new()
            .with_file("/site/docs/ok.md", "# Ok")
            .with_file("/site/docs/bad.md", "---\ntitle: [\n---\n")
            .with_unreadable("/site/docs/locked.md");

        let result = storage.scan(Path::new("/site/docs")).unwrap();

        assert_eq!(result.documents.len(), 1);
        let kinds: Vec<_> = result.failures.iter().map(|f| f.error.kind).collect();
        assert_eq!(
            kinds,
            vec![StorageErrorKind::Malformed, StorageErrorKind::PermissionDenied]
        );
    }

    #[test]
    fn test_scan_unknown_root() {
        let err = MockStorage::new().scan(Path::new("/site/docs")).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.backend, Some("Mock"));
    }

    #[test]
    fn test_exists_covers_directories() {
        let storage = MockStorage::new().with_file("/site/docs/core/index.md", "# Core");

        assert!(storage.exists(Path::new("/site/docs/core/index.md")));
        assert!(storage.exists(Path::new("/site/docs/core")));
        assert!(!storage.exists(Path::new("/site/docs/co")));
        assert!(!storage.exists(Path::new("/site/docs/concepts")));
    }

    #[test]
    fn test_write_and_remove() {
        let storage = MockStorage::new().with_file("/site/docs/intro.md", "# Intro");

        storage.write_file("/site/docs/intro.md", "# Introduction");
        let doc = storage
            .load(Path::new("/site/docs"), Path::new("intro.md"))
            .unwrap();
        assert_eq!(doc.title, "Introduction");

        assert!(storage.remove_file(Path::new("/site/docs/intro.md")));
        assert!(!storage.exists(Path::new("/site/docs/intro.md")));
        assert!(!storage.remove_file(Path::new("/site/docs/intro.md")));
    }

    #[test]
    fn test_watch_and_emit() {
        let storage = MockStorage::new();
        storage.emit("/site/docs/early.md", StorageEventKind::Created);

        let (rx, _handle) = storage.watch(&[]).unwrap();
        storage.emit("/site/docs/a.md", StorageEventKind::Created);
        storage.emit("/site/docs/b.md", StorageEventKind::Removed);

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv()).collect();
        assert_eq!(
            events,
            vec![
                StorageEvent::new("/site/docs/a.md", StorageEventKind::Created),
                StorageEvent::new("/site/docs/b.md", StorageEventKind::Removed),
            ]
        );
    }
}
