//! Build diagnostics.
//!
//! Every problem found during a build is a typed [`BuildError`] wrapped in a
//! [`Diagnostic`] that adds severity and source location. Each error kind
//! has a stable kebab-case code used in CLI output and JSON reports.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::registry::ContentId;
use crate::routes::RouteTarget;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, build continues.
    Warning,
    /// Build fails.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Everything that can go wrong while composing a site.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Unreadable or malformed source.
    #[error("cannot load {}: {message}", path.display())]
    ScanError {
        /// Source path.
        path: PathBuf,
        /// Underlying problem.
        message: String,
    },
    /// Required front matter missing or malformed.
    #[error("invalid metadata for `{id}`: {message}")]
    InvalidMetadata {
        /// Affected item.
        id: ContentId,
        /// What is wrong.
        message: String,
    },
    /// Two sources collapse to the same id.
    #[error("duplicate id `{id}` ({} and {})", first.display(), second.display())]
    DuplicateId {
        /// Colliding id.
        id: ContentId,
        /// Source that claimed the id first.
        first: PathBuf,
        /// Source rejected for reusing it.
        second: PathBuf,
    },
    /// Sidebar specification does not match the expected shape.
    #[error("invalid sidebar at `{location}`: {message}")]
    InvalidSidebar {
        /// Position in the specification (e.g., `main[1].items[3]`).
        location: String,
        /// What is wrong.
        message: String,
    },
    /// Sidebar doc reference to an id that does not exist.
    #[error("sidebar item `{location}` references unknown doc `{id}`")]
    DanglingNavReference {
        /// Referenced id.
        id: ContentId,
        /// Position in the specification.
        location: String,
    },
    /// Same doc referenced twice in one sidebar.
    #[error("doc `{id}` is referenced twice in one sidebar (`{first}` and `{second}`)")]
    DuplicateNavReference {
        /// Referenced id.
        id: ContentId,
        /// First reference.
        first: String,
        /// Second reference.
        second: String,
    },
    /// Category nesting deeper than allowed.
    #[error("sidebar nesting at `{location}` exceeds the maximum depth of {max_depth}")]
    NavTooDeep {
        /// Position of the first category that is too deep.
        location: String,
        /// Configured limit.
        max_depth: usize,
    },
    /// Two units resolve to the same route path.
    #[error("route `{path}` is claimed by both {first} and {second}")]
    RouteCollision {
        /// Contested path.
        path: String,
        /// Target that claimed the path first.
        first: RouteTarget,
        /// Target rejected for reusing it.
        second: RouteTarget,
    },
    /// Navigation link, redirect, navbar or footer target without a route.
    #[error("{location} links to `{target}`, which is not a route")]
    DanglingNavLink {
        /// Link target as written.
        target: String,
        /// Where the link is declared.
        location: String,
    },
    /// In-body link to a page that does not exist.
    #[error("`{from}` links to `{target}`, which does not resolve")]
    DanglingCrossReference {
        /// Link target as written.
        target: String,
        /// Item containing the link.
        from: ContentId,
    },
    /// Internal consistency check failed while assembling.
    #[error("site map invariant violated: {message}")]
    AssemblyInvariantViolation {
        /// Which invariant.
        message: String,
    },
    /// Sidebar references a draft outside preview mode.
    #[error("sidebar item `{location}` references draft `{id}`; it is left out")]
    DraftNavReference {
        /// Draft id.
        id: ContentId,
        /// Position in the specification.
        location: String,
    },
    /// Category without children after filtering.
    #[error("category `{label}` at `{location}` has no items and is left out")]
    EmptyCategoryPruned {
        /// Category label.
        label: String,
        /// Position in the specification.
        location: String,
    },
}

impl BuildError {
    /// Stable diagnostic code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ScanError { .. } => "scan-error",
            Self::InvalidMetadata { .. } => "invalid-metadata",
            Self::DuplicateId { .. } => "duplicate-id",
            Self::InvalidSidebar { .. } => "invalid-sidebar",
            Self::DanglingNavReference { .. } => "dangling-nav-reference",
            Self::DuplicateNavReference { .. } => "duplicate-nav-reference",
            Self::NavTooDeep { .. } => "nav-too-deep",
            Self::RouteCollision { .. } => "route-collision",
            Self::DanglingNavLink { .. } => "dangling-nav-link",
            Self::DanglingCrossReference { .. } => "dangling-cross-reference",
            Self::AssemblyInvariantViolation { .. } => "assembly-invariant-violation",
            Self::DraftNavReference { .. } => "draft-nav-reference",
            Self::EmptyCategoryPruned { .. } => "empty-category-pruned",
        }
    }
}

/// Where a diagnostic points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// File, relative to the site root when possible.
    pub file: PathBuf,
    /// 1-based line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Position inside a structured file (e.g., `main[1].items[3]`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

impl SourceLocation {
    /// Location covering a whole file.
    #[must_use]
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            line: None,
            pointer: None,
        }
    }

    /// Attach a line number.
    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a structural pointer.
    #[must_use]
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(pointer) = &self.pointer {
            write!(f, " ({pointer})")?;
        }
        Ok(())
    }
}

/// A build error with severity and location.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// The typed problem.
    pub error: BuildError,
    /// Where it was found.
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    #[must_use]
    pub fn error(error: BuildError) -> Self {
        Self {
            severity: Severity::Error,
            error,
            location: None,
        }
    }

    /// Create a warning diagnostic.
    #[must_use]
    pub fn warning(error: BuildError) -> Self {
        Self {
            severity: Severity::Warning,
            error,
            location: None,
        }
    }

    /// Attach a source location.
    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Stable diagnostic code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    /// Whether this diagnostic fails the build.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code(), self.error)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct View<'a> {
            severity: Severity,
            code: &'static str,
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            source_location: Option<&'a SourceLocation>,
        }

        View {
            severity: self.severity,
            code: self.code(),
            message: self.error.to_string(),
            source_location: self.location.as_ref(),
        }
        .serialize(serializer)
    }
}

/// Count errors in a diagnostic list.
#[must_use]
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn docs_id(id: &str) -> ContentId {
        ContentId::new("docs", id)
    }

    #[test]
    fn test_codes_are_kebab_case() {
        let err = BuildError::DanglingNavReference {
            id: docs_id("core/missing-doc"),
            location: "main[1]".to_owned(),
        };
        assert_eq!(err.code(), "dangling-nav-reference");
        assert_eq!(
            err.to_string(),
            "sidebar item `main[1]` references unknown doc `docs:core/missing-doc`"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning(BuildError::EmptyCategoryPruned {
            label: "Guides".to_owned(),
            location: "main[2]".to_owned(),
        })
        .at(SourceLocation::file("sidebars.yaml").with_pointer("main[2]"));

        assert_eq!(
            diag.to_string(),
            "warning[empty-category-pruned]: category `Guides` at `main[2]` has no items \
             and is left out at sidebars.yaml (main[2])"
        );
        assert!(!diag.is_error());
    }

    #[test]
    fn test_diagnostic_serializes_flat() {
        let diag = Diagnostic::error(BuildError::ScanError {
            path: PathBuf::from("docs/bad.md"),
            message: "Malformed source".to_owned(),
        })
        .at(SourceLocation::file("docs/bad.md").with_line(3));

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "severity": "error",
                "code": "scan-error",
                "message": "cannot load docs/bad.md: Malformed source",
                "sourceLocation": {"file": "docs/bad.md", "line": 3}
            })
        );
    }

    #[test]
    fn test_error_count() {
        let diagnostics = vec![
            Diagnostic::error(BuildError::AssemblyInvariantViolation {
                message: "x".to_owned(),
            }),
            Diagnostic::warning(BuildError::DraftNavReference {
                id: docs_id("wip"),
                location: "main[0]".to_owned(),
            }),
        ];
        assert_eq!(error_count(&diagnostics), 1);
    }
}
