//! The context package: everything assembled for one task request.

use crate::knowledge::{CodePattern, KnowledgeItem};
use crate::memory::{ActionRecord, MemoryEntry};
use crate::profile::UserProfile;
use crate::project::ProjectContext;
use crate::quality::QualityAssessment;
use crate::task::{Priority, TaskRequest, TaskType};
use crate::tool::ToolDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPackage {
    pub id: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub session_id: String,
    pub user_id: String,
    pub user_input: String,
    pub system_instructions: Vec<String>,
    pub project_context: ProjectContext,
    /// Most recent interaction first.
    pub short_term_memory: Vec<MemoryEntry>,
    pub long_term_memory: UserProfile,
    pub relevant_knowledge: Vec<KnowledgeItem>,
    pub related_patterns: Vec<CodePattern>,
    pub available_tools: Vec<ToolDescriptor>,
    pub action_history: Vec<ActionRecord>,
    pub quality_report: QualityAssessment,
    /// Soft warnings from branches that degraded during assembly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Set when the package is the minimal fallback.
    #[serde(default)]
    pub degraded: bool,
    /// 0 for the first assembly, incremented by each refinement.
    #[serde(default)]
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

impl ContextPackage {
    /// An empty, structurally complete package for a request.
    pub fn empty(request: &TaskRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type: request.task_type,
            priority: request.priority,
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            user_input: request.user_input.clone(),
            system_instructions: Vec::new(),
            project_context: ProjectContext::default(),
            short_term_memory: Vec::new(),
            long_term_memory: UserProfile::new(request.user_id.clone()),
            relevant_knowledge: Vec::new(),
            related_patterns: Vec::new(),
            available_tools: Vec::new(),
            action_history: Vec::new(),
            quality_report: QualityAssessment::unscored(),
            warnings: Vec::new(),
            degraded: false,
            revision: 0,
            created_at: Utc::now(),
        }
    }

    /// A new package derived from this one, for a refinement pass.
    /// The derived package gets a fresh id so no two passes alias.
    pub fn next_revision(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            revision: self.revision + 1,
            created_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn request(&self) -> TaskRequest {
        TaskRequest {
            task_type: self.task_type,
            user_input: self.user_input.clone(),
            priority: self.priority,
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}
