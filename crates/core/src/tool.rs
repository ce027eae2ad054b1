//! Tool descriptors: what the downstream model is told it can use.

use crate::error::SourceError;
use crate::task::TaskType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub purpose: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            capabilities: Vec::new(),
            limitations: Vec::new(),
        }
    }

    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    pub fn limitation(mut self, text: impl Into<String>) -> Self {
        self.limitations.push(text.into());
        self
    }
}

/// Lookup of tools available for a task.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn available_tools(&self, task_type: TaskType) -> Result<Vec<ToolDescriptor>, SourceError>;
}
