//! Knowledge items and code patterns: the normalized shape every source
//! result is mapped into before it reaches a context package.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a knowledge item came from, at the coarsest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Internal,
    External,
}

/// The concrete source a knowledge item was retrieved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ProjectDocs,
    FileSearch,
    CodeIndex,
    LibraryDocs,
    WebSearch,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::ProjectDocs,
        SourceKind::FileSearch,
        SourceKind::CodeIndex,
        SourceKind::LibraryDocs,
        SourceKind::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectDocs => "project_docs",
            Self::FileSearch => "file_search",
            Self::CodeIndex => "code_index",
            Self::LibraryDocs => "library_docs",
            Self::WebSearch => "web_search",
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Self::ProjectDocs | Self::FileSearch | Self::CodeIndex => Provenance::Internal,
            Self::LibraryDocs | Self::WebSearch => Provenance::External,
        }
    }

    /// Source-priority weight used by relevance scoring (0.0–1.0).
    /// Internal sources outrank unauthenticated external ones.
    pub fn priority_weight(&self) -> f32 {
        match self {
            Self::ProjectDocs => 1.0,
            Self::FileSearch => 0.9,
            Self::CodeIndex => 0.8,
            Self::LibraryDocs => 0.6,
            Self::WebSearch => 0.4,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Pattern,
    Solution,
    BestPractice,
    Example,
}

impl KnowledgeKind {
    /// Classify free text by the vocabulary it uses. Falls back to `Example`.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("best practice") || lower.contains("guideline") || lower.contains("recommend") {
            Self::BestPractice
        } else if lower.contains("pattern") {
            Self::Pattern
        } else if lower.contains("fix") || lower.contains("solution") || lower.contains("resolve") || lower.contains("workaround") {
            Self::Solution
        } else {
            Self::Example
        }
    }
}

/// A normalized unit of retrieved information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub provenance: Provenance,
    pub source: SourceKind,
    pub kind: KnowledgeKind,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub body: String,
    /// Relevance score (0.0–1.0), set by the scoring strategy.
    pub relevance: f32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub last_used: DateTime<Utc>,
    #[serde(default)]
    pub use_count: u32,
}

impl KnowledgeItem {
    /// Key used for deduplication: normalized title + description.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.title, &self.description)
    }

    /// All text a scorer may match query terms against.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.body)
    }
}

/// A structural shape that recurs across code-search hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePattern {
    pub id: String,
    pub language: String,
    pub name: String,
    pub description: String,
    /// Keyword skeleton shared by every occurrence.
    pub shape: String,
    pub occurrences: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    pub relevance: f32,
}

impl CodePattern {
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.name, &self.description)
    }
}

/// Lowercase, collapse whitespace and join with a unit separator.
pub fn dedup_key(title: &str, description: &str) -> String {
    format!("{}\u{1f}{}", normalize_text(title), normalize_text(description))
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_ignores_case_and_spacing() {
        assert_eq!(
            dedup_key("  Retry   Policy", "Use exponential\tbackoff"),
            dedup_key("retry policy", "use exponential backoff ")
        );
        assert_ne!(dedup_key("a", "bc"), dedup_key("ab", "c"));
    }

    #[test]
    fn internal_sources_outrank_external() {
        for source in SourceKind::ALL {
            if source.provenance() == Provenance::Internal {
                assert!(source.priority_weight() > SourceKind::LibraryDocs.priority_weight());
            }
        }
        assert!(SourceKind::WebSearch.priority_weight() < SourceKind::LibraryDocs.priority_weight());
    }

    #[test]
    fn classify_by_vocabulary() {
        assert_eq!(KnowledgeKind::classify("Best practice for errors"), KnowledgeKind::BestPractice);
        assert_eq!(KnowledgeKind::classify("Builder pattern"), KnowledgeKind::Pattern);
        assert_eq!(KnowledgeKind::classify("Fix for deadlock"), KnowledgeKind::Solution);
        assert_eq!(KnowledgeKind::classify("Hello world"), KnowledgeKind::Example);
    }
}
