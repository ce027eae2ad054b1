//! Map raw provider hits into [`KnowledgeItem`]s.
//!
//! Relevance is left at zero here; the integrator scores every item with
//! the configured [`RelevanceScorer`](crate::scoring::RelevanceScorer)
//! after normalization. Undated hits are stamped with `retrieved_at`.

use chrono::{DateTime, Utc};
use ctxforge_core::knowledge::{KnowledgeItem, KnowledgeKind, SourceKind};
use ctxforge_core::project::ProjectDocument;
use ctxforge_core::source::{CodeHit, DocHit, FileHit, WebHit};
use std::collections::BTreeSet;
use uuid::Uuid;

const DESCRIPTION_CHARS: usize = 200;

fn item(
    source: SourceKind,
    title: String,
    description: String,
    body: String,
    tags: impl IntoIterator<Item = String>,
    last_used: DateTime<Utc>,
) -> KnowledgeItem {
    let kind = KnowledgeKind::classify(&format!("{title} {description}"));
    let mut tags: BTreeSet<String> = tags.into_iter().filter(|t| !t.is_empty()).collect();
    tags.insert(source.as_str().to_string());
    KnowledgeItem {
        id: Uuid::new_v4().to_string(),
        provenance: source.provenance(),
        source,
        kind,
        title,
        description,
        body,
        relevance: 0.0,
        tags,
        last_used,
        use_count: 0,
    }
}

/// First paragraph of `text`, cut at a char boundary.
pub fn summarize(text: &str) -> String {
    let paragraph = text
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#'))
        .unwrap_or("");
    let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= DESCRIPTION_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(DESCRIPTION_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

pub fn from_web(hit: WebHit, retrieved_at: DateTime<Utc>) -> KnowledgeItem {
    item(
        SourceKind::WebSearch,
        hit.title,
        summarize(&hit.snippet),
        hit.snippet,
        [hit.url],
        hit.published_at.unwrap_or(retrieved_at),
    )
}

pub fn from_code(hit: &CodeHit, retrieved_at: DateTime<Utc>) -> KnowledgeItem {
    let title = match &hit.symbol {
        Some(symbol) => format!("{symbol} ({})", hit.path),
        None => hit.path.clone(),
    };
    item(
        SourceKind::CodeIndex,
        title,
        first_code_line(&hit.snippet).to_string(),
        hit.snippet.clone(),
        [hit.language.to_lowercase(), hit.path.clone()],
        retrieved_at,
    )
}

pub fn from_file(hit: FileHit, retrieved_at: DateTime<Utc>) -> KnowledgeItem {
    item(
        SourceKind::FileSearch,
        hit.path.clone(),
        summarize(&hit.preview),
        hit.preview,
        [hit.path],
        hit.modified_at.unwrap_or(retrieved_at),
    )
}

pub fn from_doc(hit: DocHit, retrieved_at: DateTime<Utc>) -> KnowledgeItem {
    let mut tags = vec![hit.library.to_lowercase()];
    tags.extend(hit.url);
    item(
        SourceKind::LibraryDocs,
        format!("{}: {}", hit.library, hit.title),
        summarize(&hit.content),
        hit.content,
        tags,
        retrieved_at,
    )
}

pub fn from_project_doc(doc: &ProjectDocument) -> KnowledgeItem {
    item(
        SourceKind::ProjectDocs,
        doc.title.clone(),
        summarize(&doc.body),
        doc.body.clone(),
        [doc.path.clone()],
        doc.modified_at,
    )
}

/// First non-blank line, trimmed.
pub fn first_code_line(snippet: &str) -> &str {
    snippet
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
