//! External capability providers: web, code index, file and library docs.
//!
//! Every provider is optional. The host wires whichever it has into a
//! [`Providers`] bundle; absent providers contribute nothing.

use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeHit {
    pub path: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHit {
    pub path: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocHit {
    pub library: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>, SourceError>;
}

#[async_trait]
pub trait CodeIndexSearch: Send + Sync {
    async fn search(&self, query: &str, language: Option<&str>) -> Result<Vec<CodeHit>, SourceError>;
}

#[async_trait]
pub trait FileSearch: Send + Sync {
    async fn search(&self, pattern: &str, root: &Path) -> Result<Vec<FileHit>, SourceError>;
}

#[async_trait]
pub trait LibraryDocSearch: Send + Sync {
    async fn lookup(&self, library: &str, topic: Option<&str>) -> Result<Vec<DocHit>, SourceError>;
}

/// The set of capability providers supplied by the host.
#[derive(Clone, Default)]
pub struct Providers {
    pub web: Option<Arc<dyn WebSearch>>,
    pub code: Option<Arc<dyn CodeIndexSearch>>,
    pub files: Option<Arc<dyn FileSearch>>,
    pub docs: Option<Arc<dyn LibraryDocSearch>>,
}

impl Providers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_web(mut self, provider: Arc<dyn WebSearch>) -> Self {
        self.web = Some(provider);
        self
    }

    pub fn with_code(mut self, provider: Arc<dyn CodeIndexSearch>) -> Self {
        self.code = Some(provider);
        self
    }

    pub fn with_files(mut self, provider: Arc<dyn FileSearch>) -> Self {
        self.files = Some(provider);
        self
    }

    pub fn with_docs(mut self, provider: Arc<dyn LibraryDocSearch>) -> Self {
        self.docs = Some(provider);
        self
    }

    /// Names of the configured providers, in a stable order.
    pub fn configured(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.web.is_some() {
            names.push("web_search");
        }
        if self.code.is_some() {
            names.push("code_search");
        }
        if self.files.is_some() {
            names.push("file_search");
        }
        if self.docs.is_some() {
            names.push("library_docs");
        }
        names
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("configured", &self.configured())
            .finish()
    }
}
