//! Route path normalization and slug helpers.

/// Normalize a route path: leading slash, no empty segments, no trailing
/// slash except for the root.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join route fragments and normalize the result.
#[must_use]
pub fn join_route(parts: &[&str]) -> String {
    normalize_path(&parts.join("/"))
}

/// Turn a label or tag into a URL slug (`Getting Started!` → `getting-started`).
#[must_use]
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for ch in label.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Strip `#fragment` and `?query` from a link target.
#[must_use]
pub fn strip_fragment(target: &str) -> &str {
    let end = target.find(['#', '?']).unwrap_or(target.len());
    &target[..end]
}
