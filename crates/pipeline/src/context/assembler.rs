//! Context assembly: the orchestrator.
//!
//! Issues six independent branches concurrently and merges them into a
//! [`ContextPackage`]:
//!
//! | Branch              | Source                       | On failure                 |
//! |---------------------|------------------------------|----------------------------|
//! | project context     | [`ProjectStore::snapshot`]   | empty snapshot + warning   |
//! | short-term memory   | [`MemoryStore`]              | empty history + warning    |
//! | long-term memory    | [`MemoryStore`]              | default profile + warning  |
//! | knowledge           | [`SourceIntegrator::collect`]| empty lists + warnings     |
//! | tools               | [`ToolCatalog`]              | empty list + warning       |
//! | action history      | [`MemoryStore`]              | empty list                 |
//!
//! Each branch writes a disjoint field, so branch order never affects the
//! result. Every branch is bounded by the same branch timeout. When the
//! project, both memory reads and every source are unavailable the caller
//! gets the fallback package instead.

use crate::context::instructions::{baseline_instructions, system_instructions};
use crate::optimizer::{Refiner, Remediation};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use ctxforge_core::event::{EventBus, PipelineEvent};
use ctxforge_core::knowledge::{CodePattern, KnowledgeItem};
use ctxforge_core::memory::{ActionKind, ActionRecord, MemoryEntry, Outcome};
use ctxforge_core::package::ContextPackage;
use ctxforge_core::profile::UserProfile;
use ctxforge_core::project::{ProjectContext, ProjectStore};
use ctxforge_core::quality::{Findings, QualityAssessment};
use ctxforge_core::task::TaskRequest;
use ctxforge_core::tool::ToolCatalog;
use ctxforge_memory::MemoryStore;
use ctxforge_sources::SourceIntegrator;
use ctxforge_sources::rank::{dedup, rank, rank_patterns};
use futures::future::join_all;
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Completeness reported by the fallback package.
pub const FALLBACK_COMPLETENESS: u8 = 20;

// ── Settings ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub branch_timeout: Duration,
    pub recent_action_limit: usize,
    /// Items below this relevance are dropped by the prune remediation.
    pub prune_threshold: f32,
    /// Memory older than this is dropped by the refresh remediation.
    pub stale_after_days: u32,
    /// How long [`ContextAssembler::record_outcome`] waits on the write
    /// before leaving it to finish in the background.
    pub record_timeout: Duration,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            branch_timeout: Duration::from_millis(5000),
            recent_action_limit: 20,
            prune_threshold: 0.25,
            stale_after_days: 7,
            record_timeout: Duration::from_millis(8000),
        }
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

pub struct ContextAssembler {
    memory: Arc<MemoryStore>,
    sources: Arc<SourceIntegrator>,
    project: Option<Arc<dyn ProjectStore>>,
    catalog: Arc<dyn ToolCatalog>,
    settings: AssemblerSettings,
    events: Option<Arc<EventBus>>,
}

impl ContextAssembler {
    pub fn new(
        memory: Arc<MemoryStore>,
        sources: Arc<SourceIntegrator>,
        catalog: Arc<dyn ToolCatalog>,
        settings: AssemblerSettings,
    ) -> Self {
        Self {
            memory,
            sources,
            project: None,
            catalog,
            settings,
            events: None,
        }
    }

    pub fn with_project(mut self, project: Arc<dyn ProjectStore>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }

    /// Build the raw package for a request. Never fails.
    pub async fn assemble(&self, request: &TaskRequest) -> ContextPackage {
        let started = Instant::now();
        let limit = self.settings.branch_timeout;

        let project_branch = async {
            match &self.project {
                Some(store) => Some(within("project_context", limit, store.snapshot()).await),
                None => None,
            }
        };
        let collect_branch = async {
            Ok::<_, Infallible>(
                self.sources
                    .collect(&request.user_input, request.task_type)
                    .await,
            )
        };
        let actions_branch = async {
            Ok::<_, Infallible>(
                self.memory
                    .recent_actions(&request.session_id, self.settings.recent_action_limit)
                    .await,
            )
        };

        let (project, short_term, long_term, collection, tools, prior_actions) = tokio::join!(
            project_branch,
            within("short_term_memory", limit, self.memory.try_short_term(&request.session_id)),
            within("long_term_memory", limit, self.memory.try_long_term(&request.user_id)),
            within("sources", limit, collect_branch),
            within("tool_catalog", limit, self.catalog.available_tools(request.task_type)),
            within("action_history", limit, actions_branch),
        );

        let mut warnings = Vec::new();

        let (project_context, project_ok) = match project {
            Some(Ok(context)) => (context, true),
            Some(Err(warning)) => {
                warnings.push(warning);
                (ProjectContext::default(), false)
            }
            None => (ProjectContext::default(), false),
        };

        let short_term_ok = short_term.is_ok();
        let short_term_memory = short_term.unwrap_or_else(|warning| {
            self.memory_degraded("short_term_memory", &warning);
            warnings.push(warning);
            Vec::new()
        });

        let long_term_ok = long_term.is_ok();
        let long_term_memory = long_term.unwrap_or_else(|warning| {
            self.memory_degraded("long_term_memory", &warning);
            warnings.push(warning);
            UserProfile::new(request.user_id.clone())
        });

        let collection = match collection {
            Ok(collection) => {
                warnings.extend(collection.warnings.iter().cloned());
                Some(collection)
            }
            Err(warning) => {
                warnings.push(warning);
                None
            }
        };
        let sources_unavailable = collection
            .as_ref()
            .is_none_or(|c| c.sources_attempted.is_empty() || c.all_failed());

        if !project_ok && !short_term_ok && !long_term_ok && sources_unavailable {
            warn!(
                session_id = %request.session_id,
                warnings = warnings.len(),
                "Every context branch unavailable, returning fallback package"
            );
            return self.fallback(request, warnings, started);
        }

        let mut package = ContextPackage::empty(request);
        package.system_instructions = system_instructions(request.task_type);
        package.project_context = project_context;
        package.short_term_memory = short_term_memory;
        package.long_term_memory = long_term_memory;
        package.available_tools = tools.unwrap_or_else(|warning| {
            warnings.push(warning);
            Vec::new()
        });
        package.action_history = prior_actions.unwrap_or_default();

        if let Some(collection) = collection {
            for kind in &collection.sources_attempted {
                let items = collection
                    .knowledge_items
                    .iter()
                    .filter(|i| i.source == *kind)
                    .count();
                let success = !collection.sources_failed.contains(kind);
                package.action_history.push(ActionRecord::new(
                    ActionKind::SourceQueried {
                        source: kind.as_str().to_string(),
                        items,
                    },
                    success,
                ));
            }
            package.relevant_knowledge = collection.knowledge_items;
            package.related_patterns = collection.code_patterns;
        }
        package.warnings = warnings;

        self.assembled(&package, started);
        package
    }

    fn fallback(&self, request: &TaskRequest, warnings: Vec<String>, started: Instant) -> ContextPackage {
        let mut package = ContextPackage::empty(request);
        package.system_instructions = baseline_instructions();
        package.degraded = true;
        package.warnings = warnings;
        package.quality_report = QualityAssessment::new(
            FALLBACK_COMPLETENESS,
            0,
            0,
            Findings {
                missing_information: vec![
                    "Project context".to_string(),
                    "Session memory".to_string(),
                    "Relevant knowledge or documentation".to_string(),
                ],
                potential_issues: vec!["All context sources were unavailable".to_string()],
                optimization_suggestions: Vec::new(),
                can_proceed: false,
                rationale: "fallback package: project, memory and knowledge sources were all unavailable"
                    .to_string(),
            },
        );
        self.assembled(&package, started);
        package
    }

    fn assembled(&self, package: &ContextPackage, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            package_id = %package.id,
            session_id = %package.session_id,
            task_type = %package.task_type,
            knowledge = package.relevant_knowledge.len(),
            patterns = package.related_patterns.len(),
            tools = package.available_tools.len(),
            memory = package.short_term_memory.len(),
            degraded = package.degraded,
            duration_ms,
            "Context assembled"
        );
        self.publish(PipelineEvent::AssemblyCompleted {
            package_id: package.id.clone(),
            session_id: package.session_id.clone(),
            duration_ms,
            knowledge_items: package.relevant_knowledge.len(),
            patterns: package.related_patterns.len(),
            tools: package.available_tools.len(),
            memory_entries: package.short_term_memory.len(),
            degraded: package.degraded,
            timestamp: Utc::now(),
        });
    }

    /// Write the interaction summary to memory. Failures are absorbed by
    /// the memory store. The write runs on its own task; the caller waits
    /// at most `record_timeout` for it.
    pub async fn record_outcome(&self, package: &ContextPackage, assessment: &QualityAssessment) {
        let outcome = if assessment.can_proceed {
            Outcome::Success
        } else {
            Outcome::Partial
        };
        let action = ActionRecord::new(
            ActionKind::ContextAssembled {
                task_type: package.task_type,
                priority: package.priority,
                session_id: package.session_id.clone(),
                overall_score: assessment.overall(),
                knowledge_items: package.relevant_knowledge.len(),
                patterns: package.related_patterns.len(),
                tools: package.available_tools.len(),
            },
            true,
        );
        let output = format!(
            "{} package scored {} (can proceed: {}), {} knowledge items, {} patterns, {} tools",
            package.task_type,
            assessment.overall(),
            assessment.can_proceed,
            package.relevant_knowledge.len(),
            package.related_patterns.len(),
            package.available_tools.len()
        );
        let entry = MemoryEntry::new(package.user_input.clone(), output, vec![action]).with_outcome(outcome);

        let memory = Arc::clone(&self.memory);
        let session_id = package.session_id.clone();
        let user_id = package.user_id.clone();
        let write = tokio::spawn(async move {
            memory.record_interaction(&session_id, &user_id, entry).await;
        });
        match tokio::time::timeout(self.settings.record_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Recording task failed"),
            Err(_) => warn!(
                session_id = %package.session_id,
                timeout_ms = self.settings.record_timeout.as_millis() as u64,
                "Recording still in flight, continuing without it"
            ),
        }
    }

    // ── Refinement helpers ────────────────────────────────────────────────

    /// Merge new items into a package, keeping dedup and ranking intact.
    /// Returns how many new entries survived.
    fn merge(&self, package: &mut ContextPackage, items: Vec<KnowledgeItem>, patterns: Vec<CodePattern>) -> usize {
        let settings = self.sources.settings();
        let before = package.relevant_knowledge.len() + package.related_patterns.len();

        let mut knowledge = std::mem::take(&mut package.relevant_knowledge);
        knowledge.extend(items);
        package.relevant_knowledge = rank(dedup(knowledge), settings.max_items);

        let mut merged_patterns = std::mem::take(&mut package.related_patterns);
        merged_patterns.extend(patterns);
        package.related_patterns = rank_patterns(merged_patterns, settings.max_patterns);

        (package.relevant_knowledge.len() + package.related_patterns.len()).saturating_sub(before)
    }

    async fn fill_gaps(&self, package: &mut ContextPackage, gaps: &[String]) -> bool {
        let base = package.user_input.clone();
        let task_type = package.task_type;
        let fetches = gaps
            .iter()
            .map(|gap| self.sources.collect_for_gap(&base, gap, task_type));
        let settled = tokio::time::timeout(self.settings.branch_timeout, join_all(fetches)).await;
        match settled {
            Ok(collections) => {
                let mut items = Vec::new();
                let mut patterns = Vec::new();
                for collection in collections {
                    items.extend(collection.knowledge_items);
                    patterns.extend(collection.code_patterns);
                }
                let added = self.merge(package, items, patterns);
                debug!(gaps = gaps.len(), added, "Gap refetch finished");
                added > 0
            }
            Err(_) => {
                warn!(gaps = gaps.len(), "Gap refetch timed out");
                false
            }
        }
    }

    async fn apply(&self, remediation: Remediation, package: &mut ContextPackage) -> bool {
        match remediation {
            Remediation::RefetchKnowledge => {
                let mut query = package.user_input.clone();
                for tech in package.long_term_memory.preferred_technologies(3) {
                    query.push(' ');
                    query.push_str(&tech);
                }
                let collect = self.sources.collect(&query, package.task_type);
                match tokio::time::timeout(self.settings.branch_timeout, collect).await {
                    Ok(collection) => {
                        self.merge(package, collection.knowledge_items, collection.code_patterns) > 0
                    }
                    Err(_) => false,
                }
            }
            Remediation::PruneLowRelevance => {
                let threshold = self.settings.prune_threshold;
                let before = package.relevant_knowledge.len() + package.related_patterns.len();
                package.relevant_knowledge.retain(|i| i.relevance >= threshold);
                package.related_patterns.retain(|p| p.relevance >= threshold);
                package.relevant_knowledge.len() + package.related_patterns.len() < before
            }
            Remediation::RefreshMemory => {
                let cutoff = package.created_at - ChronoDuration::days(i64::from(self.settings.stale_after_days));
                let mut fresh = self.memory.get_short_term(&package.session_id).await;
                fresh.retain(|e| e.timestamp >= cutoff);
                package.short_term_memory = fresh;
                true
            }
        }
    }

    fn applied(&self, package: &mut ContextPackage, iteration: u32, remediation: &str, success: bool) {
        debug!(iteration, remediation, success, "Remediation applied");
        package.action_history.push(ActionRecord::new(
            ActionKind::Refinement {
                iteration,
                remediation: remediation.to_string(),
            },
            success,
        ));
        self.publish(PipelineEvent::RefinementApplied {
            iteration,
            remediation: remediation.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn memory_degraded(&self, operation: &str, reason: &str) {
        self.publish(PipelineEvent::MemoryDegraded {
            operation: operation.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

#[async_trait]
impl Refiner for ContextAssembler {
    async fn refine(
        &self,
        package: &ContextPackage,
        assessment: &QualityAssessment,
        iteration: u32,
    ) -> ContextPackage {
        let mut next = package.next_revision();

        if !assessment.missing_information.is_empty() {
            let success = self.fill_gaps(&mut next, &assessment.missing_information).await;
            self.applied(&mut next, iteration, "fill_gaps", success);
        }

        for suggestion in &assessment.optimization_suggestions {
            match Remediation::from_suggestion(suggestion) {
                Some(remediation) => {
                    let success = self.apply(remediation, &mut next).await;
                    self.applied(&mut next, iteration, remediation.as_str(), success);
                }
                None => {
                    warn!(suggestion = %suggestion, "No remediation for suggestion, skipping");
                    self.publish(PipelineEvent::SuggestionSkipped {
                        suggestion: suggestion.clone(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
        next
    }
}

/// Await one branch under `limit`, mapping any failure to a warning string.
async fn within<T, E: Display>(
    branch: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, String> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(branch, error = %e, "Assembly branch failed");
            Err(format!("{branch}: {e}"))
        }
        Err(_) => {
            let timeout_ms = limit.as_millis() as u64;
            warn!(branch, timeout_ms, "Assembly branch timed out");
            Err(format!("{branch}: timed out after {timeout_ms}ms"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::catalog::{BASELINE_TOOLS, StaticToolCatalog};
    use ctxforge_core::error::{MemoryError, SourceError};
    use ctxforge_core::event::drain;
    use ctxforge_core::knowledge::{KnowledgeKind, SourceKind};
    use ctxforge_core::memory::MemoryBackend;
    use ctxforge_core::project::ProjectDocument;
    use ctxforge_core::source::Providers;
    use ctxforge_core::task::{Priority, TaskType};
    use ctxforge_memory::InMemoryBackend;
    use ctxforge_quality::suggestions::{CLARIFY_REQUEST, PRUNE_LOW_RELEVANCE};
    use ctxforge_sources::{InMemoryProjectStore, SourceSettings};

    struct BrokenMemory;

    #[async_trait]
    impl MemoryBackend for BrokenMemory {
        fn name(&self) -> &str {
            "broken"
        }
        async fn load_session(&self, _: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
            Err(MemoryError::Storage("unreachable".into()))
        }
        async fn save_session(&self, _: &str, _: &[MemoryEntry]) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("unreachable".into()))
        }
        async fn load_profile(&self, _: &str) -> Result<Option<UserProfile>, MemoryError> {
            Err(MemoryError::Storage("unreachable".into()))
        }
        async fn save_profile(&self, _: &UserProfile) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("unreachable".into()))
        }
        async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
            Err(MemoryError::Storage("unreachable".into()))
        }
    }

    struct BrokenProject;

    #[async_trait]
    impl ProjectStore for BrokenProject {
        fn name(&self) -> &str {
            "broken"
        }
        async fn snapshot(&self) -> Result<ProjectContext, SourceError> {
            Err(SourceError::Failed {
                source_name: "project".into(),
                reason: "permission denied".into(),
            })
        }
        async fn documents(&self) -> Result<Vec<ProjectDocument>, SourceError> {
            Err(SourceError::Failed {
                source_name: "project".into(),
                reason: "permission denied".into(),
            })
        }
    }

    /// Reads succeed, writes never finish.
    struct StalledWrites;

    #[async_trait]
    impl MemoryBackend for StalledWrites {
        fn name(&self) -> &str {
            "stalled-writes"
        }
        async fn load_session(&self, _: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
            Ok(Vec::new())
        }
        async fn save_session(&self, _: &str, _: &[MemoryEntry]) -> Result<(), MemoryError> {
            std::future::pending().await
        }
        async fn load_profile(&self, _: &str) -> Result<Option<UserProfile>, MemoryError> {
            Ok(None)
        }
        async fn save_profile(&self, _: &UserProfile) -> Result<(), MemoryError> {
            std::future::pending().await
        }
        async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
            Ok(Vec::new())
        }
    }

    struct HangingProject;

    #[async_trait]
    impl ProjectStore for HangingProject {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn snapshot(&self) -> Result<ProjectContext, SourceError> {
            std::future::pending().await
        }
        async fn documents(&self) -> Result<Vec<ProjectDocument>, SourceError> {
            std::future::pending().await
        }
    }

    fn request(task_type: TaskType, input: &str) -> TaskRequest {
        TaskRequest::new(task_type, input, Priority::High, "s1")
    }

    fn assembler_with(backend: Arc<dyn MemoryBackend>, project: Arc<dyn ProjectStore>) -> ContextAssembler {
        let memory = Arc::new(MemoryStore::new(backend));
        let sources = Arc::new(
            SourceIntegrator::new(Providers::none(), SourceSettings::default()).with_project(Arc::clone(&project)),
        );
        let catalog = Arc::new(StaticToolCatalog::new(&Providers::none()));
        ContextAssembler::new(memory, sources, catalog, AssemblerSettings::default()).with_project(project)
    }

    fn knowledge(title: &str, relevance: f32) -> KnowledgeItem {
        KnowledgeItem {
            id: title.into(),
            provenance: SourceKind::ProjectDocs.provenance(),
            source: SourceKind::ProjectDocs,
            kind: KnowledgeKind::Example,
            title: title.into(),
            description: String::new(),
            body: String::new(),
            relevance,
            tags: Default::default(),
            last_used: Utc::now(),
            use_count: 0,
        }
    }

    #[tokio::test]
    async fn assembles_structurally_complete_package() {
        let project = InMemoryProjectStore::new(ProjectContext {
            goals: vec!["Ship login".into()],
            ..Default::default()
        })
        .with_document("Login", "Null checks in the login handler.");
        let assembler = assembler_with(Arc::new(InMemoryBackend::new()), Arc::new(project));

        let package = assembler
            .assemble(&request(TaskType::Bugfix, "fix null pointer in login"))
            .await;
        assert!(!package.degraded);
        assert_eq!(package.system_instructions, system_instructions(TaskType::Bugfix));
        assert_eq!(package.project_context.goals, vec!["Ship login"]);
        assert_eq!(package.relevant_knowledge.len(), 1);
        let tools: Vec<_> = package.available_tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tools, BASELINE_TOOLS);
        assert!(package.action_history.iter().any(|a| a.kind.label() == "source_queried"));
        assert!(package.warnings.is_empty());
    }

    #[tokio::test]
    async fn total_failure_returns_fallback() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let assembler =
            assembler_with(Arc::new(BrokenMemory), Arc::new(BrokenProject)).with_events(Arc::clone(&bus));

        let package = assembler
            .assemble(&request(TaskType::Feature, "add single sign-on"))
            .await;
        assert!(package.degraded);
        assert_eq!(package.system_instructions, baseline_instructions());
        assert_eq!(package.user_input, "add single sign-on");
        assert!(package.relevant_knowledge.is_empty());
        assert_eq!(package.quality_report.completeness(), FALLBACK_COMPLETENESS);
        assert!(!package.quality_report.can_proceed);
        assert!(!package.warnings.is_empty());

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e.as_ref(),
            PipelineEvent::AssemblyCompleted { degraded: true, .. }
        )));
    }

    #[tokio::test]
    async fn memory_failure_alone_degrades_softly() {
        let assembler = assembler_with(
            Arc::new(BrokenMemory),
            Arc::new(InMemoryProjectStore::new(ProjectContext::default())),
        );
        let package = assembler.assemble(&request(TaskType::General, "explain the build")).await;
        assert!(!package.degraded);
        assert!(package.short_term_memory.is_empty());
        assert_eq!(package.long_term_memory.user_id, "default");
        assert_eq!(package.warnings.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_branch_is_bounded() {
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryBackend::new())));
        let sources = Arc::new(SourceIntegrator::new(Providers::none(), SourceSettings::default()));
        let catalog = Arc::new(StaticToolCatalog::new(&Providers::none()));
        let settings = AssemblerSettings {
            branch_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let assembler = ContextAssembler::new(memory, sources, catalog, settings).with_project(Arc::new(HangingProject));

        let started = Instant::now();
        let package = assembler.assemble(&request(TaskType::General, "explain the build")).await;
        assert!(started.elapsed() <= Duration::from_millis(250));
        assert!(package.warnings.iter().any(|w| w.contains("timed out")));
        assert_eq!(package.available_tools.len(), 3);
    }

    #[tokio::test]
    async fn refine_fills_gaps_from_project_documents() {
        let project = InMemoryProjectStore::new(ProjectContext::default())
            .with_document("Crash report", "Steps to reproduce: open the app twice.");
        let assembler = assembler_with(Arc::new(InMemoryBackend::new()), Arc::new(project));
        let package = assembler
            .assemble(&request(TaskType::Bugfix, "fix null pointer in login"))
            .await;
        assert!(package.relevant_knowledge.is_empty());

        let assessment = QualityAssessment::new(
            40,
            40,
            40,
            Findings {
                missing_information: vec!["Steps to reproduce the bug".into()],
                ..Default::default()
            },
        );
        let refined = assembler.refine(&package, &assessment, 1).await;
        assert_eq!(refined.revision, 1);
        assert_ne!(refined.id, package.id);
        assert_eq!(refined.relevant_knowledge.len(), 1);
        assert!(refined.action_history.iter().any(|a| matches!(
            &a.kind,
            ActionKind::Refinement { remediation, .. } if remediation == "fill_gaps"
        ) && a.success));
    }

    #[tokio::test]
    async fn prune_and_unknown_suggestions() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let assembler = assembler_with(
            Arc::new(InMemoryBackend::new()),
            Arc::new(InMemoryProjectStore::default()),
        )
        .with_events(Arc::clone(&bus));

        let mut package = ContextPackage::empty(&request(TaskType::General, "x"));
        package.relevant_knowledge = vec![knowledge("keep", 0.9), knowledge("drop", 0.1)];
        let assessment = QualityAssessment::new(
            50,
            50,
            50,
            Findings {
                optimization_suggestions: vec![
                    PRUNE_LOW_RELEVANCE.into(),
                    CLARIFY_REQUEST.into(),
                    "reticulate splines".into(),
                ],
                ..Default::default()
            },
        );
        let refined = assembler.refine(&package, &assessment, 2).await;
        assert_eq!(refined.relevant_knowledge.len(), 1);
        assert_eq!(refined.relevant_knowledge[0].title, "keep");

        let events = drain(&mut rx);
        assert_eq!(events.iter().filter(|e| e.name() == "suggestion_skipped").count(), 2);
        assert!(events.iter().any(|e| matches!(
            e.as_ref(),
            PipelineEvent::RefinementApplied { iteration: 2, remediation, .. } if remediation == "prune_low_relevance"
        )));
    }

    #[tokio::test]
    async fn record_outcome_writes_summary() {
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryBackend::new())));
        let sources = Arc::new(SourceIntegrator::new(Providers::none(), SourceSettings::default()));
        let catalog = Arc::new(StaticToolCatalog::new(&Providers::none()));
        let assembler = ContextAssembler::new(Arc::clone(&memory), sources, catalog, AssemblerSettings::default());

        let package = ContextPackage::empty(&request(TaskType::Feature, "add sso"));
        assembler
            .record_outcome(&package, &QualityAssessment::from_scores(30, 30, 30))
            .await;

        let history = memory.get_short_term("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, Outcome::Partial);
        assert_eq!(history[0].actions[0].kind.label(), "context_assembled");
    }

    #[tokio::test(start_paused = true)]
    async fn record_outcome_does_not_wait_on_stalled_writes() {
        let memory = Arc::new(
            MemoryStore::new(Arc::new(StalledWrites)).with_write_timeout(Duration::from_secs(3600)),
        );
        let sources = Arc::new(SourceIntegrator::new(Providers::none(), SourceSettings::default()));
        let catalog = Arc::new(StaticToolCatalog::new(&Providers::none()));
        let settings = AssemblerSettings {
            record_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let assembler = ContextAssembler::new(memory, sources, catalog, settings);

        let package = ContextPackage::empty(&request(TaskType::Feature, "add sso"));
        let started = Instant::now();
        assembler
            .record_outcome(&package, &QualityAssessment::from_scores(80, 80, 80))
            .await;
        assert!(started.elapsed() <= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn refresh_memory_measures_age_from_the_package() {
        let assembler = assembler_with(
            Arc::new(InMemoryBackend::new()),
            Arc::new(InMemoryProjectStore::default()),
        );
        let mut package = ContextPackage::empty(&request(TaskType::General, "x"));
        let created = Utc::now() - ChronoDuration::days(30);
        package.created_at = created;

        let at = |days: i64| MemoryEntry::new("m", "", vec![]).at(created - ChronoDuration::days(days));
        assembler.memory.record_interaction("s1", "u1", at(10)).await;
        assembler.memory.record_interaction("s1", "u1", at(1)).await;

        assert!(assembler.apply(Remediation::RefreshMemory, &mut package).await);
        assert_eq!(package.short_term_memory.len(), 1);
        assert_eq!(package.short_term_memory[0].timestamp, created - ChronoDuration::days(1));
    }
}
