//! Source integration for ctxforge.
//!
//! Fans out to project documents and host-supplied capability providers,
//! then normalizes, scores, deduplicates and ranks what they return.

pub mod integrator;
pub mod normalize;
pub mod patterns;
pub mod project;
pub mod rank;
pub mod scoring;

pub use integrator::{Collection, SourceIntegrator, SourceSettings};
pub use project::{FileProjectStore, InMemoryProjectStore};
pub use scoring::{RelevanceScorer, WeightedRelevance, tokenize};
