//! # ctxforge Core
//!
//! Domain types, traits, and error definitions for the ctxforge context
//! assembly pipeline. This crate has no framework dependencies: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the pipeline talks to is defined as a trait here
//! (memory persistence, project store, tool catalog, capability providers).
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod knowledge;
pub mod memory;
pub mod package;
pub mod profile;
pub mod project;
pub mod quality;
pub mod source;
pub mod task;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, RequestError, Result, SourceError};
pub use event::{EventBus, PipelineEvent};
pub use knowledge::{CodePattern, KnowledgeItem, KnowledgeKind, Provenance, SourceKind};
pub use memory::{ActionKind, ActionRecord, MemoryBackend, MemoryEntry, Outcome};
pub use package::ContextPackage;
pub use profile::{PreferenceSignal, ResponseLength, UserProfile};
pub use project::{ProjectContext, ProjectDocument, ProjectStore};
pub use quality::{Confidence, Findings, QualityAssessment, overall_score};
pub use source::{CodeHit, CodeIndexSearch, DocHit, FileHit, FileSearch, LibraryDocSearch, Providers, WebHit, WebSearch};
pub use task::{Priority, TaskRequest, TaskType};
pub use tool::{ToolCatalog, ToolDescriptor};
