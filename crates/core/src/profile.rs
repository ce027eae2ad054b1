//! Long-term user profile and the preference signals that evolve it.
//!
//! The profile is a fold over [`PreferenceSignal`]s: inference strategies
//! emit signals for each new interaction and [`UserProfile::apply`] merges
//! them in. Nothing here performs I/O.

use crate::memory::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Consecutive short or long inputs needed before the response-length
/// preference moves.
pub const STREAK_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Concise,
    #[default]
    Balanced,
    Detailed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodingStyle {
    pub conventions: Vec<String>,
    pub prefers_comments: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPreferences {
    /// Count of interactions that asked for tests.
    pub testing_mentions: u32,
    /// Count of interactions that asked for documentation.
    pub documentation_mentions: u32,
}

impl WorkflowPreferences {
    pub fn test_first(&self) -> bool {
        self.testing_mentions >= STREAK_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalPreferences {
    /// Technology name → number of interactions that mentioned it.
    pub technologies: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationStyle {
    pub response_length: ResponseLength,
    pub short_streak: u32,
    pub long_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSignals {
    pub interactions: u32,
    pub successes: u32,
    pub partials: u32,
    pub failures: u32,
}

impl LearningSignals {
    /// Fraction of interactions with a known outcome that succeeded.
    pub fn success_rate(&self) -> Option<f32> {
        let known = self.successes + self.partials + self.failures;
        (known > 0).then(|| self.successes as f32 / known as f32)
    }
}

/// Accumulated per-user preference state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub coding_style: CodingStyle,
    #[serde(default)]
    pub workflow: WorkflowPreferences,
    #[serde(default)]
    pub technical: TechnicalPreferences,
    #[serde(default)]
    pub communication: CommunicationStyle,
    #[serde(default)]
    pub learning: LearningSignals,
    pub updated_at: DateTime<Utc>,
}

/// A single inferred observation about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "value", rename_all = "snake_case")]
pub enum PreferenceSignal {
    TechnologyMentioned(String),
    ShortInput,
    LongInput,
    /// An input that was neither short nor long; breaks both streaks.
    TypicalInput,
    TestingEmphasis,
    DocumentationEmphasis,
    OutcomeObserved(Outcome),
}

impl UserProfile {
    /// A structurally complete profile with neutral preferences.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            coding_style: CodingStyle::default(),
            workflow: WorkflowPreferences::default(),
            technical: TechnicalPreferences::default(),
            communication: CommunicationStyle::default(),
            learning: LearningSignals::default(),
            updated_at: Utc::now(),
        }
    }

    /// Merge one signal into the profile.
    pub fn apply(&mut self, signal: &PreferenceSignal) {
        match signal {
            PreferenceSignal::TechnologyMentioned(name) => {
                *self.technical.technologies.entry(name.to_lowercase()).or_insert(0) += 1;
            }
            PreferenceSignal::ShortInput => {
                self.communication.short_streak += 1;
                self.communication.long_streak = 0;
                if self.communication.short_streak >= STREAK_THRESHOLD {
                    self.communication.response_length = ResponseLength::Concise;
                }
            }
            PreferenceSignal::LongInput => {
                self.communication.long_streak += 1;
                self.communication.short_streak = 0;
                if self.communication.long_streak >= STREAK_THRESHOLD {
                    self.communication.response_length = ResponseLength::Detailed;
                }
            }
            PreferenceSignal::TypicalInput => {
                self.communication.short_streak = 0;
                self.communication.long_streak = 0;
            }
            PreferenceSignal::TestingEmphasis => self.workflow.testing_mentions += 1,
            PreferenceSignal::DocumentationEmphasis => {
                self.workflow.documentation_mentions += 1;
                self.coding_style.prefers_comments =
                    self.workflow.documentation_mentions >= STREAK_THRESHOLD;
            }
            PreferenceSignal::OutcomeObserved(outcome) => {
                self.learning.interactions += 1;
                match outcome {
                    Outcome::Success => self.learning.successes += 1,
                    Outcome::Partial => self.learning.partials += 1,
                    Outcome::Failure => self.learning.failures += 1,
                    Outcome::Unknown => {}
                }
            }
        }
    }

    /// Apply a batch of signals and stamp the update time.
    pub fn apply_all(&mut self, signals: &[PreferenceSignal]) {
        for signal in signals {
            self.apply(signal);
        }
        self.updated_at = Utc::now();
    }

    /// Top technologies by mention count (ties broken alphabetically).
    pub fn preferred_technologies(&self, limit: usize) -> Vec<String> {
        let mut techs: Vec<(&String, &u32)> = self.technical.technologies.iter().collect();
        techs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        techs.into_iter().take(limit).map(|(name, _)| name.clone()).collect()
    }

    /// True once any signal has been folded in.
    pub fn has_history(&self) -> bool {
        self.learning.interactions > 0 || !self.technical.technologies.is_empty()
    }
}
