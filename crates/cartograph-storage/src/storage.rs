//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait for discovering and loading content
//! sources, along with [`StorageError`] for unified error handling across
//! backends.
//!
//! # Path Convention
//!
//! Content sources are addressed by a collection root plus a path relative to
//! it, always `/`-separated (`core/index.md`, `2024-03-01-launch.md`). Raw
//! auxiliary files such as sidebar specifications are addressed by absolute
//! path.

use std::path::{Path, PathBuf};

use crate::event::{StorageEventReceiver, WatchHandle};
use crate::front_matter::{FrontMatter, split_front_matter};
use crate::title::resolve_title;

/// A content source with its front matter parsed and its title resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceDocument {
    /// Path relative to the collection root (e.g., `core/index.md`).
    pub rel_path: PathBuf,
    /// Parsed front matter (default when the file has none).
    pub front_matter: FrontMatter,
    /// Markdown body following the front matter.
    pub body: String,
    /// 1-based line of the source file where `body` starts.
    pub body_line: usize,
    /// Resolved title: front matter title > first H1 > title-cased file stem.
    pub title: String,
}

impl SourceDocument {
    /// Parse raw source content.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageErrorKind::Malformed`] error when the front matter
    /// is unterminated or is not valid YAML.
    pub fn parse(rel_path: &Path, content: &str) -> Result<Self, StorageError> {
        let malformed = |source| {
            StorageError::new(StorageErrorKind::Malformed)
                .with_path(rel_path)
                .with_source(source)
        };

        let split = split_front_matter(content).map_err(malformed)?;
        let front_matter = match split.yaml {
            Some(yaml) => FrontMatter::from_yaml(yaml).map_err(malformed)?,
            None => FrontMatter::default(),
        };
        let title = resolve_title(front_matter.title.as_deref(), split.body, rel_path);

        Ok(Self {
            rel_path: rel_path.to_path_buf(),
            body: split.body.to_owned(),
            body_line: split.body_line,
            front_matter,
            title,
        })
    }
}

/// A source that could not be loaded during a scan.
#[derive(Debug)]
pub struct ScanFailure {
    /// Path relative to the scanned root.
    pub rel_path: PathBuf,
    /// Why the source was rejected.
    pub error: StorageError,
}

/// Outcome of scanning one collection root.
///
/// A scan does not stop at the first bad file: loadable sources end up in
/// `documents`, the rest in `failures`, both ordered by path.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Successfully loaded sources.
    pub documents: Vec<SourceDocument>,
    /// Sources that could not be read or parsed.
    pub failures: Vec<ScanFailure>,
}

/// Semantic error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Invalid path (e.g., escapes the root).
    InvalidPath,
    /// Source exists but its content is malformed (e.g., bad front matter).
    Malformed,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_path(path)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData => StorageErrorKind::Malformed,
            _ => StorageErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        f.write_str(match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::InvalidPath => "Invalid path",
            StorageErrorKind::Malformed => "Malformed source",
            StorageErrorKind::Other => "Error",
        })?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Storage abstraction for content discovery and retrieval.
///
/// Implementations never modify sources.
pub trait Storage: Send + Sync {
    /// Discover and load every content source below `root`.
    ///
    /// Hidden entries and entries starting with `_` are skipped; only `.md`
    /// and `.mdx` files are content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if `root` itself cannot be listed. Problems
    /// with individual sources are reported in [`ScanResult::failures`].
    fn scan(&self, root: &Path) -> Result<ScanResult, StorageError>;

    /// Load a single content source.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the source is missing, unreadable or has
    /// malformed front matter.
    fn load(&self, root: &Path, rel_path: &Path) -> Result<SourceDocument, StorageError>;

    /// Read a raw auxiliary file (sidebar specification, authors map).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or can't be read.
    fn read(&self, path: &Path) -> Result<String, StorageError>;

    /// Check whether a file or directory exists.
    ///
    /// Returns `false` on errors.
    fn exists(&self, path: &Path) -> bool;

    /// Start watching `roots` for changes.
    ///
    /// Events carry absolute paths. Default implementation returns a no-op
    /// receiver for backends that don't support change notification.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if watching cannot be started.
    fn watch(
        &self,
        roots: &[PathBuf],
    ) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let _ = roots;
        Ok((StorageEventReceiver::no_op(), WatchHandle::no_op()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_io_kinds() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let invalid = std::io::Error::new(std::io::ErrorKind::InvalidData, "not utf-8");

        assert_eq!(
            StorageError::io(not_found, None).kind,
            StorageErrorKind::NotFound
        );
        assert_eq!(
            StorageError::io(denied, None).kind,
            StorageErrorKind::PermissionDenied
        );
        assert_eq!(
            StorageError::io(invalid, None).kind,
            StorageErrorKind::Malformed
        );
    }

    #[test]
    fn test_storage_error_not_found_keeps_path() {
        let err = StorageError::not_found("/site/docs/intro.md");

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.path.as_deref(), Some(Path::new("/site/docs/intro.md")));
    }

    #[test]
    fn test_storage_error_downcast_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StorageError::new(StorageErrorKind::NotFound).with_source(io_err);

        assert!(err.downcast_source::<std::io::Error>().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_storage_error_display_simple() {
        let err = StorageError::new(StorageErrorKind::Malformed);
        assert_eq!(err.to_string(), "Malformed source");
    }

    #[test]
    fn test_storage_error_display_full() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StorageError::new(StorageErrorKind::NotFound)
            .with_backend("Fs")
            .with_path("/site/docs/intro.md")
            .with_source(io_err);

        assert_eq!(
            err.to_string(),
            "[Fs] Not found: file not found (path: /site/docs/intro.md)"
        );
    }

    #[test]
    fn test_parse_source_document() {
        let doc = SourceDocument::parse(
            Path::new("notes/2024-03-01-launch.md"),
            "---\ntags: release\n---\nWe shipped.\n",
        )
        .unwrap();

        assert_eq!(doc.title, "Launch");
        assert_eq!(doc.front_matter.tags, vec!["release".to_owned()]);
        assert_eq!(doc.body, "We shipped.\n");
        assert_eq!(doc.body_line, 4);
    }

    #[test]
    fn test_parse_malformed_front_matter() {
        let err = SourceDocument::parse(Path::new("bad.md"), "---\ntitle: x\n").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::Malformed);
        assert_eq!(err.path.as_deref(), Some(Path::new("bad.md")));
    }

    #[test]
    fn test_storage_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StorageError>();
        assert_send_sync::<ScanResult>();
    }
}
