//! YAML front matter parsing.
//!
//! A content source may start with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Getting Started
//! sidebar_position: 2
//! tags: [intro]
//! ---
//! # Getting Started
//! ```
//!
//! Recognized keys are mapped onto [`FrontMatter`]; unknown keys are ignored.

use serde::{Deserialize, Deserializer};

/// Front matter fields recognized by the composition engine.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    /// Replaces the final segment of the path-derived id.
    pub id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Route slug; absolute when it starts with `/`.
    pub slug: Option<String>,
    /// Label used in navigation instead of the title.
    pub sidebar_label: Option<String>,
    /// Explicit sibling order.
    #[serde(alias = "order")]
    pub sidebar_position: Option<f64>,
    /// Tags (a single string is accepted).
    #[serde(deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
    /// Publication date as written (`YYYY-MM-DD`, optionally with a time).
    pub date: Option<String>,
    /// Excluded from builds outside preview mode.
    pub draft: bool,
    /// Short summary.
    pub description: Option<String>,
    /// Author keys (a single string is accepted).
    #[serde(deserialize_with = "one_or_many")]
    pub authors: Vec<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

impl FrontMatter {
    /// Parse front matter from the YAML between the fences.
    ///
    /// An empty block yields the default front matter.
    ///
    /// # Errors
    ///
    /// Returns [`FrontMatterError::Yaml`] if the YAML is malformed or a
    /// recognized key has the wrong type.
    pub fn from_yaml(yaml: &str) -> Result<Self, FrontMatterError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Front matter parsing error.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    /// Opening `---` without a closing one.
    #[error("front matter is not terminated by a `---` line")]
    Unterminated,
    /// YAML syntax or type error.
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Source content split at the front matter fence.
#[derive(Debug, PartialEq, Eq)]
pub struct SplitSource<'a> {
    /// YAML between the fences, `None` when the source has no front matter.
    pub yaml: Option<&'a str>,
    /// Everything after the closing fence.
    pub body: &'a str,
    /// 1-based line where `body` starts.
    pub body_line: usize,
}

/// Split a source into its front matter block and body.
///
/// # Errors
///
/// Returns [`FrontMatterError::Unterminated`] when the opening fence has no
/// matching closing fence.
pub fn split_front_matter(content: &str) -> Result<SplitSource<'_>, FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(SplitSource {
            yaml: None,
            body: content,
            body_line: 1,
        });
    };

    let mut offset = 0;
    // The opening fence is line 1.
    let mut line_no = 1;
    for line in rest.split_inclusive('\n') {
        line_no += 1;
        if line.trim_end() == "---" {
            return Ok(SplitSource {
                yaml: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
                body_line: line_no + 1,
            });
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated)
}
