//! Memory types and the persistence trait behind the memory store.
//!
//! Short-term memory is a per-session log of interactions. Long-term memory
//! is a per-user [`UserProfile`](crate::profile::UserProfile) that is only
//! ever merged into, never deleted.

use crate::error::MemoryError;
use crate::profile::UserProfile;
use crate::task::{Priority, TaskType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived outcome of an interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Partial,
    Failure,
    #[default]
    Unknown,
}

impl Outcome {
    /// Derive an outcome from the actions taken during an interaction.
    pub fn derive(actions: &[ActionRecord]) -> Self {
        if actions.is_empty() {
            return Self::Unknown;
        }
        let succeeded = actions.iter().filter(|a| a.success).count();
        if succeeded == actions.len() {
            Self::Success
        } else if succeeded == 0 {
            Self::Failure
        } else {
            Self::Partial
        }
    }
}

/// What an action was, as a tagged variant per shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    ContextAssembled {
        task_type: TaskType,
        priority: Priority,
        session_id: String,
        overall_score: u8,
        knowledge_items: usize,
        patterns: usize,
        tools: usize,
    },
    SourceQueried {
        source: String,
        items: usize,
    },
    Refinement {
        iteration: u32,
        remediation: String,
    },
    Custom {
        name: String,
        #[serde(default)]
        detail: String,
    },
}

impl ActionKind {
    pub fn label(&self) -> &str {
        match self {
            Self::ContextAssembled { .. } => "context_assembled",
            Self::SourceQueried { .. } => "source_queried",
            Self::Refinement { .. } => "refinement",
            Self::Custom { name, .. } => name,
        }
    }
}

/// A record of one operation taken while assembling or using a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(flatten)]
    pub kind: ActionKind,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, success: bool) -> Self {
        Self {
            kind,
            success,
            timestamp: Utc::now(),
        }
    }
}

/// One short-term interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub outcome: Outcome,
}

impl MemoryEntry {
    /// Build an entry stamped now, with the outcome derived from `actions`.
    pub fn new(user_input: impl Into<String>, output: impl Into<String>, actions: Vec<ActionRecord>) -> Self {
        let outcome = Outcome::derive(&actions);
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_input: user_input.into(),
            output: output.into(),
            actions,
            outcome,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Persistence for short-term logs and long-term profiles.
///
/// Implementations: file (JSONL), in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Load a session's log in chronological order. Unknown sessions are empty.
    async fn load_session(&self, session_id: &str) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// Replace a session's log.
    async fn save_session(&self, session_id: &str, entries: &[MemoryEntry]) -> Result<(), MemoryError>;

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, MemoryError>;

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), MemoryError>;

    /// Ids of every session with a stored log.
    async fn list_sessions(&self) -> Result<Vec<String>, MemoryError>;
}
