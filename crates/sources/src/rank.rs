//! Deduplication and provenance-split ranking.

use ctxforge_core::knowledge::{CodePattern, KnowledgeItem, Provenance};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Merge items with equal normalized title+description.
///
/// The survivor carries the higher relevance (and that item's content),
/// the union of both tag sets, the later `last_used` and the larger
/// `use_count`. First-seen order is preserved.
pub fn dedup(items: Vec<KnowledgeItem>) -> Vec<KnowledgeItem> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<KnowledgeItem> = Vec::with_capacity(items.len());

    for item in items {
        let key = item.dedup_key();
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                let mut tags = std::mem::take(&mut existing.tags);
                tags.extend(item.tags.iter().cloned());
                let last_used = existing.last_used.max(item.last_used);
                let use_count = existing.use_count.max(item.use_count);
                if item.relevance > existing.relevance {
                    *existing = item;
                }
                existing.tags = tags;
                existing.last_used = last_used;
                existing.use_count = use_count;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

fn by_relevance_desc(a: &KnowledgeItem, b: &KnowledgeItem) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| a.title.cmp(&b.title))
}

/// Sort by relevance and keep at most `cap` items per provenance.
/// The result is in non-increasing relevance order.
pub fn rank(items: Vec<KnowledgeItem>, cap: usize) -> Vec<KnowledgeItem> {
    let (mut internal, mut external): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.provenance == Provenance::Internal);

    internal.sort_by(by_relevance_desc);
    external.sort_by(by_relevance_desc);
    internal.truncate(cap);
    external.truncate(cap);

    let mut ranked = internal;
    ranked.extend(external);
    ranked.sort_by(by_relevance_desc);
    ranked
}

/// Drop patterns whose normalized name+description repeat, keeping the
/// more relevant one, then sort and cap.
pub fn rank_patterns(patterns: Vec<CodePattern>, cap: usize) -> Vec<CodePattern> {
    let mut best: HashMap<String, CodePattern> = HashMap::new();
    for pattern in patterns {
        let key = pattern.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.relevance >= pattern.relevance => {}
            _ => {
                best.insert(key, pattern);
            }
        }
    }
    let mut ranked: Vec<CodePattern> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(cap);
    ranked
}
