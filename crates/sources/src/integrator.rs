//! `SourceIntegrator`: parallel fan-out to every configured source.
//!
//! Every source call runs under its own timeout. A source that errors or
//! times out contributes nothing and leaves a soft warning; it never aborts
//! the collection. Absent providers are simply not attempted.
//!
//! ```text
//! query ─┬─ project docs ──┐
//!        ├─ web search ────┤
//!        ├─ code index ────┼─ normalize ─ score ─ dedup ─ rank (per provenance)
//!        ├─ file search ───┤        └──── code hits ─ pattern extraction
//!        └─ library docs ──┘
//! ```

use crate::normalize;
use crate::patterns;
use crate::project::search_documents;
use crate::rank::{dedup, rank, rank_patterns};
use crate::scoring::{RelevanceScorer, WeightedRelevance, tokenize};
use chrono::Utc;
use ctxforge_core::error::SourceError;
use ctxforge_core::event::{EventBus, PipelineEvent};
use ctxforge_core::knowledge::{CodePattern, KnowledgeItem, SourceKind};
use ctxforge_core::project::ProjectStore;
use ctxforge_core::source::{CodeHit, Providers};
use ctxforge_core::task::TaskType;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Library names recognised in a query and sent to the docs provider.
pub const KNOWN_LIBRARIES: &[&str] = &[
    "tokio", "serde", "axum", "actix", "reqwest", "clap", "sqlx", "diesel", "tracing", "hyper",
    "react", "vue", "svelte", "nextjs", "express", "django", "flask", "fastapi", "pandas", "numpy",
    "pytorch", "tensorflow", "spring", "rails", "prisma", "redux", "jest", "pytest",
];

/// Language hints passed to the code index when present in a query.
const LANGUAGES: &[&str] = &[
    "rust", "python", "javascript", "typescript", "go", "java", "kotlin", "swift", "ruby", "csharp",
    "cpp", "c",
];

// ── Settings & results ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Per-source timeout.
    pub timeout: Duration,
    /// Cap per provenance on returned knowledge items.
    pub max_items: usize,
    pub max_patterns: usize,
    /// Root handed to the file-search provider.
    pub file_search_root: PathBuf,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            max_items: 10,
            max_patterns: 5,
            file_search_root: PathBuf::from("."),
        }
    }
}

/// Outcome of one collection.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Deduplicated, in non-increasing relevance order.
    pub knowledge_items: Vec<KnowledgeItem>,
    pub code_patterns: Vec<CodePattern>,
    pub warnings: Vec<String>,
    pub sources_attempted: Vec<SourceKind>,
    pub sources_failed: Vec<SourceKind>,
}

impl Collection {
    /// True when at least one source was attempted and every one failed.
    pub fn all_failed(&self) -> bool {
        !self.sources_attempted.is_empty()
            && self.sources_attempted.len() == self.sources_failed.len()
    }

    pub fn succeeded(&self) -> usize {
        self.sources_attempted.len() - self.sources_failed.len()
    }
}

/// What one branch produced: `None` if not attempted.
type Branch<T> = Option<Result<Vec<T>, SourceError>>;

// ── Integrator ────────────────────────────────────────────────────────────

pub struct SourceIntegrator {
    project: Option<Arc<dyn ProjectStore>>,
    providers: Providers,
    scorer: Arc<dyn RelevanceScorer>,
    settings: SourceSettings,
    events: Option<Arc<EventBus>>,
}

impl SourceIntegrator {
    pub fn new(providers: Providers, settings: SourceSettings) -> Self {
        Self {
            project: None,
            providers,
            scorer: Arc::new(WeightedRelevance::default()),
            settings,
            events: None,
        }
    }

    pub fn with_project(mut self, project: Arc<dyn ProjectStore>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    /// Fan out to every source and merge what comes back.
    pub async fn collect(&self, query: &str, task_type: TaskType) -> Collection {
        let started = Instant::now();
        let terms = tokenize(query);
        let language = detect(&terms, LANGUAGES);
        let libraries = detect_all(&terms, KNOWN_LIBRARIES);

        debug!(
            task_type = %task_type,
            terms = terms.len(),
            libraries = libraries.len(),
            "Collecting from sources"
        );

        let project_branch = async {
            match &self.project {
                Some(store) => {
                    let fut = async {
                        let docs = store.documents().await?;
                        Ok::<_, SourceError>(search_documents(&docs, &terms))
                    };
                    Some(self.bounded(SourceKind::ProjectDocs, fut).await)
                }
                None => None,
            }
        };

        let web_branch = async {
            match &self.providers.web {
                Some(web) => Some(self.bounded(SourceKind::WebSearch, web.search(query)).await),
                None => None,
            }
        };

        let code_branch = async {
            match &self.providers.code {
                Some(code) => Some(
                    self.bounded(SourceKind::CodeIndex, code.search(query, language))
                        .await,
                ),
                None => None,
            }
        };

        let file_branch = async {
            match &self.providers.files {
                Some(files) => Some(
                    self.bounded(
                        SourceKind::FileSearch,
                        files.search(query, &self.settings.file_search_root),
                    )
                    .await,
                ),
                None => None,
            }
        };

        let docs_branch = async {
            match &self.providers.docs {
                Some(docs) if !libraries.is_empty() => {
                    let fut = async {
                        let lookups = libraries.iter().map(|lib| docs.lookup(lib, Some(query)));
                        let mut hits = Vec::new();
                        let mut last_error = None;
                        let results = join_all(lookups).await;
                        let total = results.len();
                        for result in results {
                            match result {
                                Ok(found) => hits.extend(found),
                                Err(e) => {
                                    warn!(error = %e, "Library doc lookup failed");
                                    last_error = Some(e);
                                }
                            }
                        }
                        match last_error {
                            Some(e) if hits.is_empty() && total > 0 => Err(e),
                            _ => Ok(hits),
                        }
                    };
                    Some(self.bounded(SourceKind::LibraryDocs, fut).await)
                }
                _ => None,
            }
        };

        let (project, web, code, files, docs) =
            tokio::join!(project_branch, web_branch, code_branch, file_branch, docs_branch);

        let now = Utc::now();
        let mut collection = Collection::default();
        let mut items: Vec<KnowledgeItem> = Vec::new();

        let project: Branch<KnowledgeItem> = project;
        if let Some(found) = settle(&mut collection, SourceKind::ProjectDocs, project) {
            items.extend(found);
        }
        if let Some(hits) = settle(&mut collection, SourceKind::WebSearch, web) {
            items.extend(hits.into_iter().map(|h| normalize::from_web(h, now)));
        }
        let mut code_hits: Vec<CodeHit> = Vec::new();
        if let Some(hits) = settle(&mut collection, SourceKind::CodeIndex, code) {
            items.extend(hits.iter().map(|h| normalize::from_code(h, now)));
            code_hits = hits;
        }
        if let Some(hits) = settle(&mut collection, SourceKind::FileSearch, files) {
            items.extend(hits.into_iter().map(|h| normalize::from_file(h, now)));
        }
        if let Some(hits) = settle(&mut collection, SourceKind::LibraryDocs, docs) {
            items.extend(hits.into_iter().map(|h| normalize::from_doc(h, now)));
        }

        for item in &mut items {
            item.relevance = self.scorer.score(&terms, item, now);
        }

        let raw = items.len();
        collection.knowledge_items = rank(dedup(items), self.settings.max_items);
        collection.code_patterns = rank_patterns(
            patterns::extract(&code_hits, &terms),
            self.settings.max_patterns,
        );

        info!(
            attempted = collection.sources_attempted.len(),
            failed = collection.sources_failed.len(),
            raw_items = raw,
            items = collection.knowledge_items.len(),
            patterns = collection.code_patterns.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Source collection finished"
        );
        collection
    }

    /// A narrower collection aimed at one missing-information gap.
    pub async fn collect_for_gap(&self, base_query: &str, gap: &str, task_type: TaskType) -> Collection {
        let query = format!("{gap} {base_query}");
        self.collect(&query, task_type).await
    }

    /// Run one source under the configured timeout and publish its outcome.
    async fn bounded<T>(
        &self,
        kind: SourceKind,
        fut: impl Future<Output = Result<Vec<T>, SourceError>>,
    ) -> Result<Vec<T>, SourceError> {
        let started = Instant::now();
        let timeout_ms = self.settings.timeout.as_millis() as u64;
        let result = match tokio::time::timeout(self.settings.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                source_name: kind.as_str().to_string(),
                timeout_ms,
            }),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(items) => {
                debug!(source = %kind, items = items.len(), duration_ms, "Source completed");
                self.publish(PipelineEvent::SourceCompleted {
                    source: kind.as_str().to_string(),
                    items: items.len(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(source = %kind, error = %e, duration_ms, "Source failed, continuing without it");
                self.publish(PipelineEvent::SourceFailed {
                    source: kind.as_str().to_string(),
                    reason: e.to_string(),
                    timed_out: e.is_timeout(),
                    timestamp: Utc::now(),
                });
            }
        }
        result
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

/// Record a branch's outcome on the collection and hand back its hits.
fn settle<T>(collection: &mut Collection, kind: SourceKind, branch: Branch<T>) -> Option<Vec<T>> {
    let result = branch?;
    collection.sources_attempted.push(kind);
    match result {
        Ok(hits) => Some(hits),
        Err(e) => {
            collection.sources_failed.push(kind);
            collection.warnings.push(e.to_string());
            None
        }
    }
}

fn detect(terms: &BTreeSet<String>, vocabulary: &[&'static str]) -> Option<&'static str> {
    vocabulary.iter().copied().find(|v| terms.contains(*v))
}

fn detect_all(terms: &BTreeSet<String>, vocabulary: &[&'static str]) -> Vec<&'static str> {
    vocabulary.iter().copied().filter(|v| terms.contains(*v)).collect()
}
