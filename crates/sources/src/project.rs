//! Project document stores.
//!
//! [`FileProjectStore`] reads a directory laid out as:
//!
//! ```text
//! <dir>/context.json   structured ProjectContext snapshot
//! <dir>/*.md           searchable notes (decisions, progress, architecture)
//! ```
//!
//! A missing directory or `context.json` is an empty project, not an error.

use crate::normalize::from_project_doc;
use crate::scoring::tokenize;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctxforge_core::error::SourceError;
use ctxforge_core::knowledge::KnowledgeItem;
use ctxforge_core::project::{ProjectContext, ProjectDocument, ProjectStore};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONTEXT_FILE: &str = "context.json";

pub struct FileProjectStore {
    dir: PathBuf,
}

impl FileProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn failed(&self, reason: impl std::fmt::Display) -> SourceError {
        SourceError::Failed {
            source_name: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    fn name(&self) -> &str {
        "project_files"
    }

    async fn snapshot(&self) -> Result<ProjectContext, SourceError> {
        let path = self.dir.join(CONTEXT_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No project snapshot, using empty context");
                return Ok(ProjectContext::default());
            }
            Err(e) => return Err(self.failed(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| SourceError::InvalidResponse(format!("{}: {e}", path.display())))
    }

    async fn documents(&self) -> Result<Vec<ProjectDocument>, SourceError> {
        let mut reader = match tokio::fs::read_dir(&self.dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.failed(e)),
        };

        let mut documents = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| self.failed(e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let body = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| self.failed(format!("{}: {e}", path.display())))?;
            let modified_at = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            documents.push(ProjectDocument {
                path: path.display().to_string(),
                title: heading(&body).unwrap_or(stem),
                body,
                modified_at,
            });
        }
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }
}

/// The first markdown `#` heading of a document.
fn heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|h| !h.is_empty())
}

/// A fixed project, for tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    context: ProjectContext,
    documents: Vec<ProjectDocument>,
}

impl InMemoryProjectStore {
    pub fn new(context: ProjectContext) -> Self {
        Self {
            context,
            documents: Vec::new(),
        }
    }

    pub fn with_document(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        let title = title.into();
        self.documents.push(ProjectDocument {
            path: format!("memory://{title}"),
            title,
            body: body.into(),
            modified_at: Utc::now(),
        });
        self
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    fn name(&self) -> &str {
        "project_memory"
    }

    async fn snapshot(&self) -> Result<ProjectContext, SourceError> {
        Ok(self.context.clone())
    }

    async fn documents(&self) -> Result<Vec<ProjectDocument>, SourceError> {
        Ok(self.documents.clone())
    }
}

/// Documents sharing at least one term with the query, as knowledge items.
pub fn search_documents(documents: &[ProjectDocument], query_terms: &BTreeSet<String>) -> Vec<KnowledgeItem> {
    documents
        .iter()
        .filter(|doc| {
            let terms = tokenize(&format!("{} {}", doc.title, doc.body));
            query_terms.iter().any(|t| terms.contains(t))
        })
        .map(from_project_doc)
        .collect()
}
