//! Quality assessment for ctxforge context packages.
//!
//! Scoring is a pure function of the package: completeness from fixed
//! checkpoints, feasibility from task complexity against context support,
//! clarity from instruction/intent/consistency heuristics. The three are
//! combined by [`overall_score`](ctxforge_core::overall_score).

pub mod assessor;
pub mod checkpoints;
pub mod clarity;
pub mod feasibility;
pub mod suggestions;

pub use assessor::{Assessor, PROCEED_THRESHOLD, QualityAssessor};
