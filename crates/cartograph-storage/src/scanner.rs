//! Content discovery by filesystem walking.
//!
//! Discovery only finds candidate files; reading and parsing them is done by
//! `FsStorage`, so a single unreadable file never aborts the walk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::title::is_content_file;

/// Directories that never hold documentation sources.
const SKIPPED_DIRS: [&str; 5] = ["node_modules", "target", "dist", "build", "vendor"];

/// Whether a directory is never descended into.
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name)
}

/// Whether a path relative to a collection root is picked up by a scan.
#[must_use]
pub fn is_source_path(rel_path: &Path) -> bool {
    is_content_file(rel_path) && rel_path.parent().is_none_or(is_source_dir)
}

/// Whether a directory relative to a collection root is descended into.
pub(crate) fn is_source_dir(rel_path: &Path) -> bool {
    rel_path
        .components()
        .all(|c| !is_skipped_dir(&c.as_os_str().to_string_lossy()))
}

/// Files found below a root plus the directories that could not be listed.
#[derive(Debug, Default)]
pub(crate) struct Discovery {
    /// Content files relative to the root, sorted.
    pub files: Vec<PathBuf>,
    /// Subdirectories (relative) that failed to list.
    pub failures: Vec<(PathBuf, io::Error)>,
}

/// Walks a collection root.
pub(crate) struct Scanner<'a> {
    root: &'a Path,
}

impl<'a> Scanner<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Walk the root recursively.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the root itself cannot be listed.
    pub fn discover(&self) -> io::Result<Discovery> {
        let mut discovery = Discovery::default();
        let entries = Self::list(self.root)?;
        self.visit(entries, Path::new(""), &mut discovery);
        discovery.files.sort();
        Ok(discovery)
    }

    fn list(dir: &Path) -> io::Result<Vec<(PathBuf, bool)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            entries.push((PathBuf::from(entry.file_name()), is_dir));
        }
        entries.sort();
        Ok(entries)
    }

    fn visit(&self, entries: Vec<(PathBuf, bool)>, rel_dir: &Path, out: &mut Discovery) {
        for (name, is_dir) in entries {
            let rel_path = rel_dir.join(&name);
            if !is_dir {
                if is_content_file(&rel_path) {
                    out.files.push(rel_path);
                }
                continue;
            }

            if is_skipped_dir(&name.to_string_lossy()) {
                continue;
            }
            match Self::list(&self.root.join(&rel_path)) {
                Ok(children) => self.visit(children, &rel_path, out),
                Err(e) => {
                    tracing::warn!(
                        path = %rel_path.display(),
                        error = %e,
                        "Failed to list directory"
                    );
                    out.failures.push((rel_path, e));
                }
            }
        }
    }
}
