//! Content source storage for Cartograph.
//!
//! This crate provides a [`Storage`] trait for abstracting content discovery and
//! retrieval from the underlying backend. The composition engine in
//! `cartograph-site` only talks to content through this trait, so it can be
//! exercised against [`MockStorage`] without touching the filesystem.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait with `scan()`, `load()`, `read()`, `exists()` and `watch()`
//! - [`SourceDocument`] with parsed [`FrontMatter`], body and resolved title
//! - [`FsStorage`] implementation for filesystem backends
//! - [`MockStorage`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cartograph_storage::{FsStorage, Storage};
//!
//! let storage = FsStorage::new();
//! let result = storage.scan(Path::new("docs"))?;
//! for doc in &result.documents {
//!     println!("{}: {}", doc.rel_path.display(), doc.title);
//! }
//! ```

mod debouncer;
mod event;
mod front_matter;
mod fs;
#[cfg(feature = "mock")]
mod mock;
mod scanner;
mod storage;
mod title;

pub use event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
pub use front_matter::{FrontMatter, FrontMatterError, SplitSource, split_front_matter};
pub use fs::FsStorage;
pub use scanner::is_source_path;
#[cfg(feature = "mock")]
pub use mock::MockStorage;
pub use storage::{ScanFailure, ScanResult, SourceDocument, Storage, StorageError, StorageErrorKind};
pub use title::{is_content_file, titlecase_from_stem};
