//! The public entry point wiring config, memory, sources and scoring.

use crate::context::{AssemblerSettings, ContextAssembler, StaticToolCatalog};
use crate::optimizer::{OptimizationLoop, OptimizationResult};
use ctxforge_config::{AppConfig, MemoryConfig};
use ctxforge_core::error::{Error, RequestError};
use ctxforge_core::event::EventBus;
use ctxforge_core::memory::MemoryBackend;
use ctxforge_core::project::ProjectStore;
use ctxforge_core::source::Providers;
use ctxforge_core::task::TaskRequest;
use ctxforge_core::tool::ToolCatalog;
use ctxforge_memory::{FileBackend, InMemoryBackend, MemoryStore, NoopMemory};
use ctxforge_quality::{Assessor, QualityAssessor};
use ctxforge_sources::{FileProjectStore, RelevanceScorer, SourceIntegrator, SourceSettings, WeightedRelevance};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ContextService {
    config: AppConfig,
    memory: Arc<MemoryStore>,
    assembler: ContextAssembler,
    assessor: Arc<dyn Assessor>,
    optimizer: OptimizationLoop,
    events: Arc<EventBus>,
}

impl ContextService {
    pub fn builder(config: AppConfig) -> ContextServiceBuilder {
        ContextServiceBuilder::new(config)
    }

    /// Assemble, score and refine context for one request.
    ///
    /// Only a malformed request is an error. Every other failure degrades
    /// into warnings on the returned package.
    pub async fn handle(&self, request: TaskRequest) -> Result<OptimizationResult, RequestError> {
        request.validate()?;
        info!(
            task_type = %request.task_type,
            priority = %request.priority,
            session_id = %request.session_id,
            "Handling context request"
        );

        let package = self.assembler.assemble(&request).await;
        let result = if package.degraded {
            let assessment = package.quality_report.clone();
            OptimizationResult {
                package,
                assessment,
                passes: 0,
                history: Vec::new(),
            }
        } else {
            self.optimizer
                .run(package, self.assessor.as_ref(), &self.assembler)
                .await
        };

        self.assembler
            .record_outcome(&result.package, &result.assessment)
            .await;
        Ok(result)
    }

    /// Parse an untyped request as it arrives from a host, then handle it.
    pub async fn handle_raw(
        &self,
        task_type: &str,
        user_input: &str,
        priority: &str,
        session_id: &str,
    ) -> Result<OptimizationResult, RequestError> {
        let request = TaskRequest::parse(task_type, user_input, priority, session_id)?;
        self.handle(request).await
    }

    /// Drop short-term entries older than the configured retention.
    pub async fn cleanup(&self) -> usize {
        self.memory.cleanup(self.config.memory.retention_days).await
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

// ── Builder ───────────────────────────────────────────────────────────────

/// Collaborators left unset are derived from the config.
pub struct ContextServiceBuilder {
    config: AppConfig,
    providers: Providers,
    project: Option<Arc<dyn ProjectStore>>,
    backend: Option<Arc<dyn MemoryBackend>>,
    catalog: Option<Arc<dyn ToolCatalog>>,
    assessor: Option<Arc<dyn Assessor>>,
    scorer: Option<Arc<dyn RelevanceScorer>>,
    events: Option<Arc<EventBus>>,
}

impl ContextServiceBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            providers: Providers::none(),
            project: None,
            backend: None,
            catalog: None,
            assessor: None,
            scorer: None,
            events: None,
        }
    }

    pub fn providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    pub fn project_store(mut self, project: Arc<dyn ProjectStore>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn memory_backend(mut self, backend: Arc<dyn MemoryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn tool_catalog(mut self, catalog: Arc<dyn ToolCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn assessor(mut self, assessor: Arc<dyn Assessor>) -> Self {
        self.assessor = Some(assessor);
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<ContextService, Error> {
        let config = self.config;
        config.validate().map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let events = self.events.unwrap_or_default();

        let backend = match self.backend {
            Some(backend) => backend,
            None => backend_from_config(&config.memory)?,
        };
        let memory = Arc::new(
            MemoryStore::new(backend)
                .with_max_short_term(config.memory.max_short_term_entries)
                .with_read_timeout(config.memory.read_timeout())
                .with_write_timeout(config.memory.write_timeout())
                .with_events(Arc::clone(&events)),
        );

        let project = self
            .project
            .unwrap_or_else(|| Arc::new(FileProjectStore::new(config.assembly.project_dir.clone())));

        let weights = &config.sources.weights;
        let scorer = self.scorer.unwrap_or_else(|| {
            Arc::new(WeightedRelevance::new(
                weights.lexical,
                weights.source,
                weights.recency,
                f64::from(config.sources.recency_half_life_days),
            ))
        });

        let settings = SourceSettings {
            timeout: config.sources.timeout(),
            max_items: config.sources.max_items,
            max_patterns: config.sources.max_patterns,
            file_search_root: config.sources.file_search_root.clone(),
        };
        let sources = Arc::new(
            SourceIntegrator::new(self.providers.clone(), settings)
                .with_project(Arc::clone(&project))
                .with_scorer(scorer)
                .with_events(Arc::clone(&events)),
        );

        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(StaticToolCatalog::new(&self.providers)));

        let assembler = ContextAssembler::new(
            Arc::clone(&memory),
            sources,
            catalog,
            AssemblerSettings {
                branch_timeout: config.assembly.branch_timeout(),
                recent_action_limit: config.memory.recent_action_limit,
                prune_threshold: config.optimization.prune_threshold,
                stale_after_days: config.optimization.stale_after_days,
                record_timeout: (config.memory.read_timeout() + config.memory.write_timeout()) * 2,
            },
        )
        .with_project(project)
        .with_events(Arc::clone(&events));

        let assessor = self.assessor.unwrap_or_else(|| {
            Arc::new(QualityAssessor::new().with_stale_after_days(config.optimization.stale_after_days))
        });

        let optimizer =
            OptimizationLoop::new(config.optimization.max_refinements).with_events(Arc::clone(&events));

        info!(
            memory_backend = memory.backend_name(),
            providers = ?self.providers.configured(),
            max_refinements = config.optimization.max_refinements,
            "Context service ready"
        );

        Ok(ContextService {
            config,
            memory,
            assembler,
            assessor,
            optimizer,
            events,
        })
    }
}

fn backend_from_config(config: &MemoryConfig) -> Result<Arc<dyn MemoryBackend>, Error> {
    match config.backend.as_str() {
        "file" => Ok(Arc::new(FileBackend::new(config.resolved_path()))),
        "in_memory" => Ok(Arc::new(InMemoryBackend::new())),
        "none" => {
            warn!("Memory backend 'none': interactions will not be remembered");
            Ok(Arc::new(NoopMemory))
        }
        other => Err(Error::Config {
            message: format!("unknown memory backend '{other}'"),
        }),
    }
}
