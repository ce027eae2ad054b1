//! Project context: the collaborator-owned document store this core only reads.

use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured snapshot of the project a task belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    pub goals: Vec<String>,
    pub key_features: Vec<String>,
    pub architecture: String,
    pub open_issues: Vec<String>,
    pub recent_changes: Vec<String>,
    pub completed_tasks: Vec<String>,
    pub pending_tasks: Vec<String>,
    pub decisions: Vec<String>,
    pub patterns: Vec<String>,
}

impl ProjectContext {
    pub fn is_empty(&self) -> bool {
        self.populated_fields() == 0
    }

    /// Number of non-empty fields.
    pub fn populated_fields(&self) -> usize {
        let lists = [
            &self.goals,
            &self.key_features,
            &self.open_issues,
            &self.recent_changes,
            &self.completed_tasks,
            &self.pending_tasks,
            &self.decisions,
            &self.patterns,
        ];
        lists.iter().filter(|l| !l.is_empty()).count()
            + usize::from(!self.architecture.trim().is_empty())
    }
}

/// A searchable project document (notes, ADRs, progress logs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub path: String,
    pub title: String,
    pub body: String,
    pub modified_at: DateTime<Utc>,
}

/// Read access to the project document store.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    fn name(&self) -> &str;

    /// Read the structured project snapshot.
    async fn snapshot(&self) -> Result<ProjectContext, SourceError>;

    /// All searchable documents.
    async fn documents(&self) -> Result<Vec<ProjectDocument>, SourceError>;
}
