//! Relevance scoring: a swappable strategy behind [`RelevanceScorer`].
//!
//! The default [`WeightedRelevance`] blends three signals:
//!
//! | Signal  | Range | Meaning |
//! |---------|-------|---------|
//! | lexical | 0–1   | fraction of distinct query terms found in the item text |
//! | source  | 0–1   | [`SourceKind::priority_weight`](ctxforge_core::SourceKind::priority_weight) |
//! | recency | 0–1   | `0.5^(age_days / half_life_days)` of `last_used` |
//!
//! `relevance = (w_l·lexical + w_s·source + w_r·recency) / (w_l + w_s + w_r)`

use chrono::{DateTime, Utc};
use ctxforge_core::knowledge::KnowledgeItem;
use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "how", "i", "in",
    "into", "is", "it", "its", "me", "my", "of", "on", "or", "our", "please", "should", "so", "that",
    "the", "this", "to", "we", "what", "when", "where", "which", "why", "will", "with", "you",
];

/// Lowercased, stopword-free terms of at least two characters.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of `query_terms` that appear in `text` (0.0 for an empty query).
pub fn lexical_overlap(query_terms: &BTreeSet<String>, text: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_terms = tokenize(text);
    let hits = query_terms.iter().filter(|t| text_terms.contains(*t)).count();
    hits as f32 / query_terms.len() as f32
}

/// Strategy for scoring a knowledge item against a query.
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Relevance in `[0.0, 1.0]`.
    fn score(&self, query_terms: &BTreeSet<String>, item: &KnowledgeItem, now: DateTime<Utc>) -> f32;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRelevance {
    pub lexical: f32,
    pub source: f32,
    pub recency: f32,
    pub half_life_days: f64,
}

impl WeightedRelevance {
    pub fn new(lexical: f32, source: f32, recency: f32, half_life_days: f64) -> Self {
        Self {
            lexical: lexical.max(0.0),
            source: source.max(0.0),
            recency: recency.max(0.0),
            half_life_days: if half_life_days > 0.0 { half_life_days } else { 30.0 },
        }
    }

    /// Exponential decay of `last_used`; future timestamps count as fresh.
    pub fn recency(&self, last_used: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
        let age_days = (now - last_used).num_seconds().max(0) as f64 / 86_400.0;
        0.5f64.powf(age_days / self.half_life_days) as f32
    }
}

impl Default for WeightedRelevance {
    fn default() -> Self {
        Self::new(0.5, 0.3, 0.2, 30.0)
    }
}

impl RelevanceScorer for WeightedRelevance {
    fn name(&self) -> &str {
        "weighted"
    }

    fn score(&self, query_terms: &BTreeSet<String>, item: &KnowledgeItem, now: DateTime<Utc>) -> f32 {
        let total = self.lexical + self.source + self.recency;
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = self.lexical * lexical_overlap(query_terms, &item.searchable_text())
            + self.source * item.source.priority_weight()
            + self.recency * self.recency(item.last_used, now);
        (weighted / total).clamp(0.0, 1.0)
    }
}
