//! Code-pattern extraction from code-search hits.
//!
//! Each hit is reduced to the keyword skeleton of its first non-blank
//! line (`pub async fn handle(req: Request)` → `pub async fn _`). Hits are
//! grouped by language, and a skeleton seen at least
//! [`MIN_OCCURRENCES`] times in one language becomes a [`CodePattern`].

use crate::normalize::first_code_line;
use crate::scoring::lexical_overlap;
use ctxforge_core::knowledge::CodePattern;
use ctxforge_core::source::CodeHit;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const MIN_OCCURRENCES: usize = 2;
const MAX_EXAMPLES: usize = 3;

const KEYWORDS: &[&str] = &[
    "abstract", "async", "await", "class", "const", "crate", "def", "dyn", "enum", "export", "extends",
    "fn", "for", "func", "function", "if", "impl", "implements", "import", "interface", "let", "match",
    "mod", "mut", "private", "protected", "pub", "public", "return", "static", "struct", "trait", "type",
    "unsafe", "use", "var", "where", "while", "with",
];

/// Keywords kept, every other identifier run collapsed into `_`.
/// Returns `None` when the line contains no keyword at all.
pub fn skeleton(line: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut saw_keyword = false;
    for word in line
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        if KEYWORDS.contains(&word) {
            saw_keyword = true;
            parts.push(word);
        } else if parts.last() != Some(&"_") {
            parts.push("_");
        }
    }
    saw_keyword.then(|| parts.join(" "))
}

/// Promote repeated skeletons to patterns, most relevant first.
pub fn extract(hits: &[CodeHit], query_terms: &BTreeSet<String>) -> Vec<CodePattern> {
    // language -> shape -> hits
    let mut groups: BTreeMap<String, BTreeMap<String, Vec<&CodeHit>>> = BTreeMap::new();
    let mut per_language: BTreeMap<String, usize> = BTreeMap::new();

    for hit in hits {
        let language = hit.language.trim().to_lowercase();
        let language = if language.is_empty() { "unknown".to_string() } else { language };
        *per_language.entry(language.clone()).or_insert(0) += 1;
        if let Some(shape) = skeleton(first_code_line(&hit.snippet)) {
            groups
                .entry(language)
                .or_default()
                .entry(shape)
                .or_default()
                .push(hit);
        }
    }

    let mut patterns = Vec::new();
    for (language, shapes) in groups {
        let total = per_language.get(&language).copied().unwrap_or(1).max(1);
        for (shape, members) in shapes {
            if members.len() < MIN_OCCURRENCES {
                continue;
            }
            let text: String = members
                .iter()
                .map(|h| format!("{} {}", h.symbol.as_deref().unwrap_or(""), h.snippet))
                .collect::<Vec<_>>()
                .join(" ");
            let share = members.len() as f32 / total as f32;
            let relevance = (0.5 * share + 0.5 * lexical_overlap(query_terms, &text)).clamp(0.0, 1.0);
            let examples = members
                .iter()
                .take(MAX_EXAMPLES)
                .map(|h| match &h.symbol {
                    Some(symbol) => format!("{}::{symbol}", h.path),
                    None => h.path.clone(),
                })
                .collect();

            patterns.push(CodePattern {
                id: Uuid::new_v4().to_string(),
                name: format!("{language}: {shape}"),
                description: format!("{} occurrences of `{shape}` in {language} code", members.len()),
                language: language.clone(),
                shape,
                occurrences: members.len(),
                examples,
                relevance,
            });
        }
    }
    patterns
}
