//! Preference inference: turns an interaction into profile signals.
//!
//! The default [`KeywordInference`] is a deliberately simple heuristic:
//! it looks for known technology names, the length of the input, and a
//! handful of testing/documentation keywords. Swap it through
//! [`MemoryStore::with_inference`](crate::MemoryStore::with_inference).

use ctxforge_core::memory::MemoryEntry;
use ctxforge_core::profile::PreferenceSignal;

/// Inputs shorter than this (in chars) count as short.
pub const SHORT_INPUT_CHARS: usize = 60;
/// Inputs longer than this (in chars) count as long.
pub const LONG_INPUT_CHARS: usize = 400;

const TECHNOLOGIES: &[&str] = &[
    "rust", "tokio", "serde", "axum", "python", "django", "fastapi", "javascript", "typescript",
    "node", "react", "vue", "svelte", "nextjs", "go", "java", "kotlin", "swift", "docker",
    "kubernetes", "postgres", "postgresql", "mysql", "sqlite", "redis", "mongodb", "graphql",
    "terraform", "aws", "gcp", "azure", "wasm", "grpc", "kafka",
];

const TESTING_WORDS: &[&str] = &["test", "tests", "testing", "tdd", "unit", "coverage", "spec"];
const DOCUMENTATION_WORDS: &[&str] = &["doc", "docs", "document", "documentation", "readme", "comment", "comments"];

/// Strategy for deriving preference signals from one interaction.
pub trait PreferenceInference: Send + Sync {
    fn name(&self) -> &str;

    fn infer(&self, entry: &MemoryEntry) -> Vec<PreferenceSignal>;
}

/// Keyword and length heuristics.
#[derive(Debug, Clone, Default)]
pub struct KeywordInference;

impl PreferenceInference for KeywordInference {
    fn name(&self) -> &str {
        "keyword"
    }

    fn infer(&self, entry: &MemoryEntry) -> Vec<PreferenceSignal> {
        let input = entry.user_input.trim();
        let words = words(input);
        let mut signals = Vec::new();

        let mut seen: Vec<&str> = Vec::new();
        for word in &words {
            if let Some(tech) = TECHNOLOGIES.iter().find(|t| **t == word.as_str())
                && !seen.contains(tech)
            {
                seen.push(tech);
                signals.push(PreferenceSignal::TechnologyMentioned((*tech).to_string()));
            }
        }

        let chars = input.chars().count();
        signals.push(if chars < SHORT_INPUT_CHARS {
            PreferenceSignal::ShortInput
        } else if chars > LONG_INPUT_CHARS {
            PreferenceSignal::LongInput
        } else {
            PreferenceSignal::TypicalInput
        });

        if words.iter().any(|w| TESTING_WORDS.contains(&w.as_str())) {
            signals.push(PreferenceSignal::TestingEmphasis);
        }
        if words.iter().any(|w| DOCUMENTATION_WORDS.contains(&w.as_str())) {
            signals.push(PreferenceSignal::DocumentationEmphasis);
        }

        signals.push(PreferenceSignal::OutcomeObserved(entry.outcome));
        signals
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxforge_core::memory::Outcome;

    fn entry(input: &str) -> MemoryEntry {
        MemoryEntry::new(input, "", vec![]).with_outcome(Outcome::Success)
    }

    #[test]
    fn detects_technologies_once() {
        let signals = KeywordInference.infer(&entry("Port the Rust service to tokio, keep rust idioms"));
        let techs: Vec<_> = signals
            .iter()
            .filter_map(|s| match s {
                PreferenceSignal::TechnologyMentioned(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(techs, vec!["rust", "tokio"]);
    }

    #[test]
    fn classifies_input_length() {
        assert!(KeywordInference.infer(&entry("fix it")).contains(&PreferenceSignal::ShortInput));
        let long = "word ".repeat(100);
        assert!(KeywordInference.infer(&entry(&long)).contains(&PreferenceSignal::LongInput));
        let typical = "Refactor the session handling so that expired tokens are rejected early";
        assert!(KeywordInference.infer(&entry(typical)).contains(&PreferenceSignal::TypicalInput));
    }

    #[test]
    fn detects_workflow_emphasis() {
        let signals = KeywordInference.infer(&entry("add unit tests and update the README"));
        assert!(signals.contains(&PreferenceSignal::TestingEmphasis));
        assert!(signals.contains(&PreferenceSignal::DocumentationEmphasis));
    }

    #[test]
    fn always_reports_outcome_last() {
        let signals = KeywordInference.infer(&entry("anything"));
        assert_eq!(signals.last(), Some(&PreferenceSignal::OutcomeObserved(Outcome::Success)));
    }
}
