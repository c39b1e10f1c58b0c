//! Title resolution and content file recognition.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+?)\s*#*\s*$").expect("valid H1 regex"));

static DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-").expect("valid date prefix regex"));

/// Content file extensions.
const CONTENT_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Check whether a file name denotes a content source.
///
/// Hidden files and files starting with `_` are never content.
#[must_use]
pub fn is_content_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONTENT_EXTENSIONS.contains(&e))
}

/// Extract the text of the first `# H1` heading.
pub(crate) fn extract_h1(body: &str) -> Option<String> {
    H1_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|t| !t.is_empty())
}

/// Title-case a file stem (`getting-started` → `Getting Started`).
///
/// A leading `YYYY-MM-DD-` date prefix is dropped.
#[must_use]
pub fn titlecase_from_stem(stem: &str) -> String {
    let stem = DATE_PREFIX_RE.replace(stem, "");
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stem used for the fallback title: the parent directory for `index` files.
pub(crate) fn fallback_stem(rel_path: &Path) -> &str {
    let stem = rel_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if stem == "index"
        && let Some(parent) = rel_path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    {
        return parent;
    }
    stem
}

/// Resolve a title: explicit > first H1 > title-cased stem.
pub(crate) fn resolve_title(explicit: Option<&str>, body: &str, rel_path: &Path) -> String {
    if let Some(title) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_owned();
    }
    extract_h1(body).unwrap_or_else(|| titlecase_from_stem(fallback_stem(rel_path)))
}
