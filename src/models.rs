use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// A post as exported by the knowledge-base platform.
///
/// Unknown fields of the export are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    /// Raw markdown, usually still HTML-entity-escaped.
    #[serde(default)]
    pub body: String,
}

/// Outcome of front matter extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMatter {
    Parsed {
        /// Already in the canonical date format.
        date: Option<String>,
        tags: Option<Vec<String>>,
        categories: Option<Vec<String>>,
        /// Every other key, in the order it was written.
        extra: Mapping,
        body: String,
    },
    /// No usable metadata. `body` is the decoded and rewritten text, verbatim.
    ParseFailed { body: String },
}

impl ParsedMatter {
    pub fn body(&self) -> &str {
        match self {
            ParsedMatter::Parsed { body, .. } | ParsedMatter::ParseFailed { body } => body,
        }
    }
}
