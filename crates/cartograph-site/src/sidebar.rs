//! Sidebar specification parsing.
//!
//! A sidebar file is YAML (JSON parses too) mapping sidebar names to item
//! lists:
//!
//! ```yaml
//! main:
//!   - index                      # doc shorthand
//!   - type: category
//!     label: Core Concepts
//!     collapsed: false
//!     items:
//!       - type: doc
//!         id: core/index
//!         label: Overview
//!       - core/models
//!   - type: link
//!     label: GitHub
//!     href: https://github.com/example
//!   - type: divider
//! ```
//!
//! The file is walked as an untyped [`serde_yaml::Value`] so every problem can
//! be reported with its position (`main[1].items[3]`) and all of them are
//! collected in one pass.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::diagnostics::{BuildError, SourceLocation};

/// Parsed sidebar file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SidebarSpec {
    /// Sidebar name to top-level items, ordered by name.
    pub sidebars: BTreeMap<String, Vec<SpecItem>>,
}

/// One item of a sidebar specification.
#[derive(Clone, Debug, PartialEq)]
pub enum SpecItem {
    /// Reference to a doc of the owning collection.
    Doc {
        id: String,
        label: Option<String>,
        location: String,
    },
    /// Labelled group of items.
    Category {
        label: String,
        items: Vec<SpecItem>,
        collapsed: bool,
        generated_index: bool,
        location: String,
    },
    /// Internal or external link.
    Link {
        label: String,
        href: String,
        location: String,
    },
    /// Visual separator.
    Divider { location: String },
}

impl SpecItem {
    /// Position in the specification.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Doc { location, .. }
            | Self::Category { location, .. }
            | Self::Link { location, .. }
            | Self::Divider { location } => location,
        }
    }
}

/// Problem found while parsing a sidebar file.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecIssue {
    /// The error.
    pub error: BuildError,
    /// Line in the file, when the YAML parser knows it.
    pub line: Option<usize>,
}

impl SpecIssue {
    fn invalid(location: &str, message: impl Into<String>) -> Self {
        Self {
            error: BuildError::InvalidSidebar {
                location: location.to_owned(),
                message: message.into(),
            },
            line: None,
        }
    }

    /// Source location inside `file`.
    #[must_use]
    pub fn location(&self, file: &Path) -> SourceLocation {
        let mut location = SourceLocation::file(file);
        location.line = self.line;
        match &self.error {
            BuildError::InvalidSidebar { location: pointer, .. }
            | BuildError::NavTooDeep {
                location: pointer, ..
            } if !pointer.is_empty() => location.with_pointer(pointer.as_str()),
            _ => location,
        }
    }
}

const DOC_KEYS: &[&str] = &["type", "id", "label"];
const CATEGORY_KEYS: &[&str] = &["type", "label", "items", "collapsed", "generated_index"];
const LINK_KEYS: &[&str] = &["type", "label", "href"];
const DIVIDER_KEYS: &[&str] = &["type"];

/// Parse a sidebar file.
///
/// Category nesting deeper than `max_depth` is rejected; a top-level category
/// has depth 1.
///
/// # Errors
///
/// Returns every problem found when the file is not a valid specification.
pub fn parse_sidebars(content: &str, max_depth: usize) -> Result<SidebarSpec, Vec<SpecIssue>> {
    let document: Value = serde_yaml::from_str(content).map_err(|e| {
        vec![SpecIssue {
            error: BuildError::InvalidSidebar {
                location: String::new(),
                message: e.to_string(),
            },
            line: e.location().map(|l| l.line()),
        }]
    })?;

    let mapping = match document {
        Value::Null => return Ok(SidebarSpec::default()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(vec![SpecIssue::invalid(
                "",
                "expected a mapping from sidebar name to item list",
            )]);
        }
    };

    let mut parser = SpecParser {
        max_depth,
        issues: Vec::new(),
    };
    let mut spec = SidebarSpec::default();
    for (key, value) in &mapping {
        let Some(name) = key.as_str() else {
            parser.issue("", "sidebar names must be strings");
            continue;
        };
        let Some(items) = value.as_sequence() else {
            parser.issue(name, "expected a list of items");
            continue;
        };
        let items = parser.items(items, name, 0);
        spec.sidebars.insert(name.to_owned(), items);
    }

    if parser.issues.is_empty() {
        Ok(spec)
    } else {
        Err(parser.issues)
    }
}

struct SpecParser {
    max_depth: usize,
    issues: Vec<SpecIssue>,
}

impl SpecParser {
    fn issue(&mut self, location: &str, message: impl Into<String>) {
        self.issues.push(SpecIssue::invalid(location, message));
    }

    fn items(&mut self, values: &[Value], parent: &str, depth: usize) -> Vec<SpecItem> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| self.item(value, format!("{parent}[{i}]"), depth))
            .collect()
    }

    fn item(&mut self, value: &Value, location: String, depth: usize) -> Option<SpecItem> {
        match value {
            Value::String(id) if !id.trim().is_empty() => Some(SpecItem::Doc {
                id: id.trim().to_owned(),
                label: None,
                location,
            }),
            Value::Mapping(mapping) => self.mapping_item(mapping, location, depth),
            _ => {
                self.issue(&location, "expected a doc id or an item mapping");
                None
            }
        }
    }

    fn mapping_item(
        &mut self,
        mapping: &Mapping,
        location: String,
        depth: usize,
    ) -> Option<SpecItem> {
        let kind = self.string(mapping, "type", &location, true)?;
        let allowed = match kind.as_str() {
            "doc" => DOC_KEYS,
            "category" => CATEGORY_KEYS,
            "link" => LINK_KEYS,
            "divider" => DIVIDER_KEYS,
            other => {
                self.issue(&location, format!("unknown item type `{other}`"));
                return None;
            }
        };

        let mut valid = true;
        for key in mapping.keys() {
            match key.as_str() {
                Some(key) if allowed.contains(&key) => {}
                Some(key) => {
                    self.issue(&location, format!("unknown key `{key}` for {kind} item"));
                    valid = false;
                }
                None => {
                    self.issue(&location, "item keys must be strings");
                    valid = false;
                }
            }
        }

        let item = match kind.as_str() {
            "doc" => {
                let id = self.string(mapping, "id", &location, true);
                let label = self.string(mapping, "label", &location, false);
                SpecItem::Doc {
                    id: id?,
                    label,
                    location,
                }
            }
            "category" => {
                let label = self.string(mapping, "label", &location, true);
                let collapsed = self.boolean(mapping, "collapsed", &location).unwrap_or(true);
                let generated_index = self
                    .boolean(mapping, "generated_index", &location)
                    .unwrap_or(false);
                let depth = depth + 1;
                if depth > self.max_depth {
                    self.issues.push(SpecIssue {
                        error: BuildError::NavTooDeep {
                            location,
                            max_depth: self.max_depth,
                        },
                        line: None,
                    });
                    return None;
                }
                let items = match mapping.get("items") {
                    Some(Value::Sequence(values)) => {
                        self.items(values, &format!("{location}.items"), depth)
                    }
                    Some(_) => {
                        self.issue(&location, "`items` must be a list");
                        return None;
                    }
                    None => {
                        self.issue(&location, "missing required key `items`");
                        return None;
                    }
                };
                SpecItem::Category {
                    label: label?,
                    items,
                    collapsed,
                    generated_index,
                    location,
                }
            }
            "link" => {
                let label = self.string(mapping, "label", &location, true);
                let href = self.string(mapping, "href", &location, true);
                SpecItem::Link {
                    label: label?,
                    href: href?,
                    location,
                }
            }
            _ => SpecItem::Divider { location },
        };
        valid.then_some(item)
    }

    fn string(
        &mut self,
        mapping: &Mapping,
        key: &str,
        location: &str,
        required: bool,
    ) -> Option<String> {
        match mapping.get(key) {
            Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_owned()),
            Some(_) => {
                self.issue(location, format!("`{key}` must be a non-empty string"));
                None
            }
            None => {
                if required {
                    self.issue(location, format!("missing required key `{key}`"));
                }
                None
            }
        }
    }

    fn boolean(&mut self, mapping: &Mapping, key: &str, location: &str) -> Option<bool> {
        match mapping.get(key) {
            Some(Value::Bool(value)) => Some(*value),
            Some(_) => {
                self.issue(location, format!("`{key}` must be a boolean"));
                None
            }
            None => None,
        }
    }
}
