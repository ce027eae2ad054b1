//! Advisory optimization suggestions.
//!
//! The strings are stable: the optimization loop matches on them to pick
//! a remediation, and anything it does not recognise is skipped.

use crate::clarity::LOW_RELEVANCE;
use chrono::Duration;
use ctxforge_core::package::ContextPackage;

pub const GATHER_KNOWLEDGE: &str = "Gather more relevant knowledge for this task";
pub const PRUNE_LOW_RELEVANCE: &str = "Prune low-relevance items to reduce information overload";
pub const REFRESH_MEMORY: &str = "Refresh stale memory entries";
pub const CLARIFY_REQUEST: &str = "Clarify the request with a concrete goal and details";

/// More than this many knowledge items counts as overload.
pub const OVERLOAD_ITEMS: usize = 15;
pub const DEFAULT_STALE_AFTER_DAYS: u32 = 7;

/// Too many items, or more than 40% of them below [`LOW_RELEVANCE`].
pub fn is_overloaded(package: &ContextPackage) -> bool {
    let items = &package.relevant_knowledge;
    if items.len() > OVERLOAD_ITEMS {
        return true;
    }
    let low = items.iter().filter(|i| i.relevance < LOW_RELEVANCE).count();
    !items.is_empty() && low * 5 > items.len() * 2
}

/// The newest short-term entry is older than `stale_after`, measured from
/// the package's creation time.
pub fn is_stale(package: &ContextPackage, stale_after: Duration) -> bool {
    package
        .short_term_memory
        .iter()
        .map(|e| e.timestamp)
        .max()
        .is_some_and(|newest| package.created_at - newest > stale_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxforge_core::knowledge::{KnowledgeItem, KnowledgeKind, SourceKind};
    use ctxforge_core::memory::MemoryEntry;
    use ctxforge_core::task::{Priority, TaskRequest, TaskType};

    fn package() -> ContextPackage {
        ContextPackage::empty(&TaskRequest::new(TaskType::General, "x", Priority::Low, "s1"))
    }

    fn item(relevance: f32) -> KnowledgeItem {
        KnowledgeItem {
            id: "i".into(),
            provenance: SourceKind::WebSearch.provenance(),
            source: SourceKind::WebSearch,
            kind: KnowledgeKind::Example,
            title: "t".into(),
            description: String::new(),
            body: String::new(),
            relevance,
            tags: Default::default(),
            last_used: Utc::now(),
            use_count: 0,
        }
    }

    #[test]
    fn overload_by_count_or_noise() {
        let mut pkg = package();
        assert!(!is_overloaded(&pkg));
        pkg.relevant_knowledge = vec![item(0.9), item(0.1), item(0.8)];
        assert!(!is_overloaded(&pkg));
        pkg.relevant_knowledge = vec![item(0.9), item(0.1), item(0.05)];
        assert!(is_overloaded(&pkg));
        pkg.relevant_knowledge = (0..16).map(|_| item(0.9)).collect();
        assert!(is_overloaded(&pkg));
    }

    #[test]
    fn staleness_uses_newest_entry() {
        let mut pkg = package();
        assert!(!is_stale(&pkg, Duration::days(7)));
        let old = pkg.created_at - Duration::days(10);
        pkg.short_term_memory = vec![MemoryEntry::new("a", "", vec![]).at(old)];
        assert!(is_stale(&pkg, Duration::days(7)));
        pkg.short_term_memory.push(MemoryEntry::new("b", "", vec![]).at(pkg.created_at));
        assert!(!is_stale(&pkg, Duration::days(7)));
    }
}
