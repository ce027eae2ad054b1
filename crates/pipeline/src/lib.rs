//! The ctxforge pipeline: request in, optimized context package out.
//!
//! 1. **Validate** the task request (the only hard failure)
//! 2. **Assemble** a raw package from project, memory, sources and tools
//!    concurrently, each branch bounded and allowed to degrade
//! 3. **Score** it and, while it cannot proceed, **refine** it up to the
//!    configured cap, keeping the best-scoring pass
//! 4. **Record** the interaction in short-term memory and merge inferred
//!    preferences into the user profile

pub mod context;
pub mod optimizer;
pub mod service;

pub use context::{AssemblerSettings, ContextAssembler, StaticToolCatalog};
pub use optimizer::{OptimizationLoop, OptimizationResult, Refiner, Remediation};
pub use service::{ContextService, ContextServiceBuilder};
