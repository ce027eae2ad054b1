//! Completeness: presence-weighted checkpoints.
//!
//! | Checkpoint                      | Points |
//! |---------------------------------|--------|
//! | system instructions present     | 10     |
//! | user input ≥ 20 chars           | 15     |
//! | project context                 | 25     |
//! | relevant knowledge present      | 20     |
//! | tools available                 | 10     |
//! | task-specific requirements      | 20     |
//!
//! Project context splits as goals 7, architecture 6, key features 4,
//! open issues or recent changes 4, decisions or patterns 4. Task
//! requirements share their 20 points evenly; `General` has none and
//! always earns the full 20.

use ctxforge_core::knowledge::SourceKind;
use ctxforge_core::package::ContextPackage;
use ctxforge_core::task::TaskType;

pub const MIN_INPUT_CHARS: usize = 20;

pub const MISSING_INSTRUCTIONS: &str = "System instructions for the task";
pub const MISSING_DETAIL: &str = "A more detailed description of the request";
pub const MISSING_PROJECT: &str = "Project context (goals, architecture, key features)";
pub const MISSING_KNOWLEDGE: &str = "Relevant knowledge or documentation";
pub const MISSING_TOOLS: &str = "Available tools";

const TASK_POINTS: f64 = 20.0;

/// One task-specific element and how to recognise it in a package.
pub struct Requirement {
    pub label: &'static str,
    pub critical: bool,
    check: fn(&ContextPackage) -> bool,
}

impl Requirement {
    pub fn is_met(&self, package: &ContextPackage) -> bool {
        (self.check)(package)
    }
}

const fn req(label: &'static str, critical: bool, check: fn(&ContextPackage) -> bool) -> Requirement {
    Requirement { label, critical, check }
}

const BUGFIX: &[Requirement] = &[
    req("Steps to reproduce the bug", true, |p| {
        mentions(p, &["reproduce", "reproduction", "repro", "steps"])
    }),
    req("Error message or stack trace", false, |p| {
        mentions(p, &["error", "exception", "stack trace", "traceback", "panic", "crash", "null"])
    }),
    req("Relevant code location", false, has_code),
];

const FEATURE: &[Requirement] = &[
    req("Acceptance criteria", true, |p| {
        mentions(p, &["acceptance", "criteria", "should", "must", "expected", "given"])
    }),
    req("Project goals", false, |p| !p.project_context.goals.is_empty()),
    req("Architecture overview", false, |p| !p.project_context.architecture.trim().is_empty()),
];

const ARCHITECTURE: &[Requirement] = &[
    req("Architecture overview", true, |p| {
        !p.project_context.architecture.trim().is_empty()
            || mentions_knowledge(p, &["architecture", "component", "layer", "module"])
    }),
    req("System constraints", false, |p| {
        mentions(p, &["constraint", "requirement", "latency", "throughput", "budget", "limit"])
    }),
    req("Prior architectural decisions", false, |p| !p.project_context.decisions.is_empty()),
];

const REFACTOR: &[Requirement] = &[
    req("Target code to refactor", true, |p| has_code(p) || names_path(&p.user_input)),
    req("Refactoring goal", false, |p| {
        mentions(p, &["readab", "maintainab", "performance", "simplif", "decouple", "extract", "split", "testab", "clean"])
    }),
    req("Existing code patterns", false, |p| {
        !p.project_context.patterns.is_empty() || !p.related_patterns.is_empty()
    }),
];

const DECISION: &[Requirement] = &[
    req("Options under consideration", true, |p| {
        mentions(p, &[" or ", " vs ", "versus", "option", "alternative", "between"])
    }),
    req("Decision criteria", false, |p| {
        mentions(p, &["criteria", "trade-off", "tradeoff", "cost", "risk", "performance"])
    }),
    req("Prior decisions", false, |p| !p.project_context.decisions.is_empty()),
];

const PROGRESS: &[Requirement] = &[
    req("Current task status", true, |p| {
        !p.project_context.completed_tasks.is_empty() || !p.project_context.pending_tasks.is_empty()
    }),
    req("Recent changes", false, |p| !p.project_context.recent_changes.is_empty()),
];

/// Requirements for a task type, in checking order.
pub fn requirements(task_type: TaskType) -> &'static [Requirement] {
    match task_type {
        TaskType::Bugfix => BUGFIX,
        TaskType::Feature => FEATURE,
        TaskType::Architecture => ARCHITECTURE,
        TaskType::Refactor => REFACTOR,
        TaskType::Decision => DECISION,
        TaskType::Progress => PROGRESS,
        TaskType::General => &[],
    }
}

/// Whether the user input or any gathered knowledge mentions one of `needles`.
fn mentions(package: &ContextPackage, needles: &[&str]) -> bool {
    let input = format!(" {} ", package.user_input.to_lowercase());
    needles.iter().any(|n| input.contains(n)) || mentions_knowledge(package, needles)
}

fn mentions_knowledge(package: &ContextPackage, needles: &[&str]) -> bool {
    package.relevant_knowledge.iter().any(|item| {
        let text = item.searchable_text().to_lowercase();
        needles.iter().any(|n| text.contains(n))
    })
}

fn has_code(package: &ContextPackage) -> bool {
    !package.related_patterns.is_empty()
        || package
            .relevant_knowledge
            .iter()
            .any(|i| matches!(i.source, SourceKind::CodeIndex | SourceKind::FileSearch))
}

/// A token that looks like a file path (`src/auth.rs`, `login.py`).
fn names_path(input: &str) -> bool {
    input.split_whitespace().any(|w| {
        let w = w.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '`' | '"' | '\'' | '(' | ')'));
        w.contains('/')
            || w.rsplit_once('.')
                .is_some_and(|(stem, ext)| !stem.is_empty() && (1..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphabetic()))
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completeness {
    pub score: u8,
    pub missing: Vec<String>,
    pub critical_missing: Vec<String>,
}

pub fn completeness(package: &ContextPackage) -> Completeness {
    let mut points = 0.0;
    let mut missing = Vec::new();
    let mut critical_missing = Vec::new();

    if package.system_instructions.is_empty() {
        missing.push(MISSING_INSTRUCTIONS.to_string());
    } else {
        points += 10.0;
    }

    if package.user_input.trim().chars().count() >= MIN_INPUT_CHARS {
        points += 15.0;
    } else {
        missing.push(MISSING_DETAIL.to_string());
    }

    let project = &package.project_context;
    if project.is_empty() {
        missing.push(MISSING_PROJECT.to_string());
    } else {
        if !project.goals.is_empty() {
            points += 7.0;
        }
        if !project.architecture.trim().is_empty() {
            points += 6.0;
        }
        if !project.key_features.is_empty() {
            points += 4.0;
        }
        if !project.open_issues.is_empty() || !project.recent_changes.is_empty() {
            points += 4.0;
        }
        if !project.decisions.is_empty() || !project.patterns.is_empty() {
            points += 4.0;
        }
    }

    if package.relevant_knowledge.is_empty() {
        missing.push(MISSING_KNOWLEDGE.to_string());
    } else {
        points += 20.0;
    }

    if package.available_tools.is_empty() {
        missing.push(MISSING_TOOLS.to_string());
    } else {
        points += 10.0;
    }

    let reqs = requirements(package.task_type);
    if reqs.is_empty() {
        points += TASK_POINTS;
    } else {
        let share = TASK_POINTS / reqs.len() as f64;
        for requirement in reqs {
            if requirement.is_met(package) {
                points += share;
            } else {
                missing.push(requirement.label.to_string());
                if requirement.critical {
                    critical_missing.push(requirement.label.to_string());
                }
            }
        }
    }

    Completeness {
        score: points.round().clamp(0.0, 100.0) as u8,
        missing,
        critical_missing,
    }
}
