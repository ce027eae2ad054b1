//! Clarity: instruction clarity, user-intent clarity and internal consistency.
//!
//! `clarity = 0.4·instruction + 0.4·intent + 0.2·consistency`

use ctxforge_core::knowledge::normalize_text;
use ctxforge_core::memory::Outcome;
use ctxforge_core::package::ContextPackage;
use std::collections::HashSet;

const ACTION_VERBS: &[&str] = &[
    "add", "build", "change", "choose", "compare", "create", "debug", "decide", "design", "document",
    "evaluate", "explain", "extract", "fix", "implement", "improve", "investigate", "migrate",
    "optimize", "plan", "refactor", "remove", "rename", "replace", "report", "review", "split",
    "summarize", "test", "track", "update", "write",
];

/// Items below this relevance count as noise.
pub const LOW_RELEVANCE: f32 = 0.2;

/// 0 without directives; otherwise 50, +8 per directive up to five,
/// +10 when every directive is between 15 and 200 chars.
pub fn instruction_clarity(package: &ContextPackage) -> u8 {
    let directives = &package.system_instructions;
    if directives.is_empty() {
        return 0;
    }
    let count_bonus = 8 * directives.len().min(5) as u32;
    let well_formed = directives
        .iter()
        .all(|d| (15..=200).contains(&d.trim().chars().count()));
    (50 + count_bonus + if well_formed { 10 } else { 0 }).min(100) as u8
}

/// +50 for an action verb, +50 for 4–150 words (+25 for 2–3 or > 150).
pub fn intent_clarity(input: &str) -> u8 {
    let words: Vec<String> = input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let verb = if words.iter().any(|w| ACTION_VERBS.contains(&w.as_str())) {
        50
    } else {
        0
    };
    let length = match words.len() {
        0 | 1 => 0,
        2 | 3 => 25,
        4..=150 => 50,
        _ => 25,
    };
    verb + length
}

/// Starts at 100 and loses points for signs the gathered material
/// disagrees with itself or is unreliable.
pub fn consistency(package: &ContextPackage) -> u8 {
    let mut score: i32 = 100;

    if !package.warnings.is_empty() {
        score -= 30;
    }

    let knowledge = &package.relevant_knowledge;
    if !knowledge.is_empty() {
        let noisy = knowledge.iter().filter(|i| i.relevance < LOW_RELEVANCE).count();
        if noisy * 5 > knowledge.len() * 2 {
            score -= 20;
        }
    }

    // The same task listed as both completed and pending
    let completed: HashSet<String> = package
        .project_context
        .completed_tasks
        .iter()
        .map(|t| normalize_text(t))
        .collect();
    if package
        .project_context
        .pending_tasks
        .iter()
        .any(|t| completed.contains(&normalize_text(t)))
    {
        score -= 20;
    }

    if package
        .short_term_memory
        .first()
        .is_some_and(|e| e.outcome == Outcome::Failure)
    {
        score -= 15;
    }

    score.clamp(0, 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clarity {
    pub score: u8,
    pub instruction: u8,
    pub intent: u8,
    pub consistency: u8,
}

pub fn clarity(package: &ContextPackage) -> Clarity {
    let instruction = instruction_clarity(package);
    let intent = intent_clarity(&package.user_input);
    let consistency = consistency(package);
    let score = (0.4 * f64::from(instruction) + 0.4 * f64::from(intent) + 0.2 * f64::from(consistency))
        .round()
        .clamp(0.0, 100.0) as u8;
    Clarity {
        score,
        instruction,
        intent,
        consistency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxforge_core::memory::MemoryEntry;
    use ctxforge_core::task::{Priority, TaskRequest, TaskType};

    fn package(input: &str) -> ContextPackage {
        ContextPackage::empty(&TaskRequest::new(TaskType::General, input, Priority::Medium, "s1"))
    }

    #[test]
    fn intent_scores() {
        assert_eq!(intent_clarity("fix null pointer in login"), 100);
        assert_eq!(intent_clarity("login broken"), 25);
        assert_eq!(intent_clarity("fix"), 50);
        assert_eq!(intent_clarity(""), 0);
    }

    #[test]
    fn instruction_scores() {
        let mut pkg = package("x");
        assert_eq!(instruction_clarity(&pkg), 0);
        pkg.system_instructions = vec!["Keep answers grounded in the project.".into(); 6];
        assert_eq!(instruction_clarity(&pkg), 100);
        pkg.system_instructions = vec!["short".into()];
        assert_eq!(instruction_clarity(&pkg), 58);
    }

    #[test]
    fn consistency_penalties() {
        let mut pkg = package("x");
        assert_eq!(consistency(&pkg), 100);

        pkg.warnings.push("web_search timed out".into());
        pkg.project_context.completed_tasks = vec!["Ship login".into()];
        pkg.project_context.pending_tasks = vec!["ship  LOGIN".into()];
        pkg.short_term_memory = vec![MemoryEntry::new("x", "", vec![]).with_outcome(Outcome::Failure)];
        assert_eq!(consistency(&pkg), 35);
    }

    #[test]
    fn clarity_combines_weights() {
        let mut pkg = package("fix null pointer in login");
        pkg.system_instructions = vec!["Keep answers grounded in the project.".into(); 5];
        let result = clarity(&pkg);
        assert_eq!(result.score, 100);
        assert_eq!(result.intent, 100);
    }
}
