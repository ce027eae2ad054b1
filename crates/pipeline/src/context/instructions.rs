//! System-instruction table. Deterministic: the same task type always
//! yields the same directives in the same order.

use ctxforge_core::task::TaskType;

const BASELINE: [&str; 5] = [
    "Ground every statement in the supplied project context, memory and knowledge.",
    "Say explicitly when required information is missing instead of guessing.",
    "Prefer the project's established patterns and prior decisions over new ones.",
    "Keep changes minimal and explain the reasoning behind each recommendation.",
    "Flag risks, assumptions and open questions before proposing a final answer.",
];

fn task_directives(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::Architecture => &[
            "Describe components, their responsibilities and the boundaries between them.",
            "Evaluate the design against the stated constraints and quality attributes.",
            "Reference prior architectural decisions and note where the proposal departs from them.",
        ],
        TaskType::Feature => &[
            "Restate the acceptance criteria before proposing an implementation.",
            "Fit the feature into the existing architecture and key features.",
            "List the tests that demonstrate each acceptance criterion.",
        ],
        TaskType::Bugfix => &[
            "Reproduce the failure from the reported steps before changing code.",
            "Identify the root cause, not only the symptom.",
            "Add a regression test that fails without the fix.",
            "Check related code paths for the same defect.",
        ],
        TaskType::Refactor => &[
            "Preserve observable behavior; refactoring must not change functionality.",
            "Move in small, independently verifiable steps.",
            "Align the result with the project's existing code patterns.",
        ],
        TaskType::Decision => &[
            "Lay out every option under consideration with its trade-offs.",
            "Score options against explicit decision criteria.",
            "Record the decision and its rationale for future reference.",
        ],
        TaskType::Progress => &[
            "Summarize completed and pending tasks against project goals.",
            "Highlight blockers and recent changes that affect the plan.",
            "Propose the next concrete steps in priority order.",
        ],
        TaskType::General => &[
            "Answer directly and point to the relevant part of the project when possible.",
            "Ask a clarifying question if the request is ambiguous.",
        ],
    }
}

/// The five baseline directives shared by every task.
pub fn baseline_instructions() -> Vec<String> {
    BASELINE.iter().map(|s| s.to_string()).collect()
}

/// Baseline directives followed by the task-specific ones.
pub fn system_instructions(task_type: TaskType) -> Vec<String> {
    let mut directives = baseline_instructions();
    directives.extend(task_directives(task_type).iter().map(|s| s.to_string()));
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_are_deterministic() {
        for task_type in TaskType::ALL {
            assert_eq!(system_instructions(task_type), system_instructions(task_type));
        }
    }

    #[test]
    fn baseline_comes_first() {
        let bugfix = system_instructions(TaskType::Bugfix);
        assert_eq!(bugfix.len(), 9);
        assert_eq!(&bugfix[..5], baseline_instructions().as_slice());
        assert!(bugfix[5].contains("Reproduce"));
    }

    #[test]
    fn every_directive_is_well_formed() {
        for task_type in TaskType::ALL {
            for directive in system_instructions(task_type) {
                let len = directive.chars().count();
                assert!((15..=200).contains(&len), "{directive}");
            }
        }
    }
}
