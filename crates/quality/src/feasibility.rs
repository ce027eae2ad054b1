//! Feasibility: estimated task complexity against gathered context support.

use ctxforge_core::package::ContextPackage;
use ctxforge_core::task::TaskType;

/// Support must reach this fraction of complexity to pass the gate.
pub const SUPPORT_RATIO_GATE: f64 = 0.7;

const COMPLEXITY_WORDS: &[&str] = &[
    "distributed", "concurrent", "concurrency", "migration", "migrate", "scalab", "security",
    "performance", "legacy", "integration", "real-time", "realtime", "async", "database",
    "multi-tenant", "cross-platform", "backward compat",
];

pub fn base_complexity(task_type: TaskType) -> u32 {
    match task_type {
        TaskType::Architecture => 80,
        TaskType::Refactor => 70,
        TaskType::Feature => 60,
        TaskType::Decision => 55,
        TaskType::Bugfix => 50,
        TaskType::General => 40,
        TaskType::Progress => 30,
    }
}

/// Tool names the task is best served by.
pub fn required_tools(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::Bugfix => &["code_search", "file_search", "session_memory"],
        TaskType::Feature => &["project_context", "code_search", "library_docs"],
        TaskType::Architecture => &["project_context", "web_search", "library_docs"],
        TaskType::Refactor => &["code_search", "file_search", "project_context"],
        TaskType::Decision => &["web_search", "project_context", "session_memory"],
        TaskType::Progress => &["project_context", "session_memory"],
        TaskType::General => &["project_context"],
    }
}

/// Base value, +5 past 200 chars or +10 past 500, +5 per complexity word
/// (at most +20). Clamped to 1..=100.
pub fn complexity(task_type: TaskType, input: &str) -> u32 {
    let chars = input.chars().count();
    let length_bonus = if chars > 500 {
        10
    } else if chars > 200 {
        5
    } else {
        0
    };
    let lower = input.to_lowercase();
    let words = COMPLEXITY_WORDS.iter().filter(|w| lower.contains(*w)).count() as u32;
    (base_complexity(task_type) + length_bonus + (5 * words).min(20)).clamp(1, 100)
}

/// `min(10·(knowledge + patterns), 50) + min(5·tools, 25) + min(5·memory, 25)`
pub fn support(package: &ContextPackage) -> u32 {
    let knowledge = (package.relevant_knowledge.len() + package.related_patterns.len()) as u32;
    let tools = package.available_tools.len() as u32;
    let memory = package.short_term_memory.len() as u32;
    (10 * knowledge).min(50) + (5 * tools).min(25) + (5 * memory).min(25)
}

/// Fraction of required tools present in the package.
pub fn tool_coverage(package: &ContextPackage) -> f64 {
    let required = required_tools(package.task_type);
    if required.is_empty() {
        return 1.0;
    }
    let present = required
        .iter()
        .filter(|name| package.available_tools.iter().any(|t| t.name == **name))
        .count();
    present as f64 / required.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feasibility {
    pub score: u8,
    pub complexity: u32,
    pub support: u32,
    pub tool_coverage: f64,
    /// `support ≥ 0.7 · complexity`
    pub supported: bool,
}

pub fn feasibility(package: &ContextPackage) -> Feasibility {
    let complexity = complexity(package.task_type, &package.user_input);
    let support = support(package);
    let coverage = tool_coverage(package);
    let ratio = (f64::from(support) / f64::from(complexity)).min(1.0);
    let score = (70.0 * ratio + 30.0 * coverage).round().clamp(0.0, 100.0) as u8;
    Feasibility {
        score,
        complexity,
        support,
        tool_coverage: coverage,
        supported: f64::from(support) >= SUPPORT_RATIO_GATE * f64::from(complexity),
    }
}
