//! The bounded optimization loop.
//!
//! ```text
//! Initial ──assess──▶ Scored ──(can proceed | cap reached)──▶ Done
//!                       ▲  │
//!                       │  └──▶ Refining ──assess──┐
//!                       └──────────────────────────┘
//! ```
//!
//! The loop runs at most `max_refinements + 1` scoring passes and returns
//! the package whose assessment had the strictly highest overall score, so
//! refinement can never report a result worse than the first attempt.

use async_trait::async_trait;
use chrono::Utc;
use ctxforge_core::event::{EventBus, PipelineEvent};
use ctxforge_core::package::ContextPackage;
use ctxforge_core::quality::QualityAssessment;
use ctxforge_quality::Assessor;
use ctxforge_quality::suggestions::{GATHER_KNOWLEDGE, PRUNE_LOW_RELEVANCE, REFRESH_MEMORY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// A named, automatable fix for an optimization suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remediation {
    RefetchKnowledge,
    PruneLowRelevance,
    RefreshMemory,
}

impl Remediation {
    /// `None` for suggestions without an automatic remediation.
    pub fn from_suggestion(suggestion: &str) -> Option<Self> {
        match suggestion {
            GATHER_KNOWLEDGE => Some(Self::RefetchKnowledge),
            PRUNE_LOW_RELEVANCE => Some(Self::PruneLowRelevance),
            REFRESH_MEMORY => Some(Self::RefreshMemory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefetchKnowledge => "refetch_knowledge",
            Self::PruneLowRelevance => "prune_low_relevance",
            Self::RefreshMemory => "refresh_memory",
        }
    }
}

/// Produces a new package that addresses an assessment's findings.
/// Must never fail: anything it cannot fix is left as is.
#[async_trait]
pub trait Refiner: Send + Sync {
    async fn refine(
        &self,
        package: &ContextPackage,
        assessment: &QualityAssessment,
        iteration: u32,
    ) -> ContextPackage;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// The best package, with `quality_report` set to `assessment`.
    pub package: ContextPackage,
    pub assessment: QualityAssessment,
    /// Scoring passes run (1 + refinements).
    pub passes: u32,
    /// Every assessment in pass order.
    pub history: Vec<QualityAssessment>,
}

pub struct OptimizationLoop {
    max_refinements: u32,
    events: Option<Arc<EventBus>>,
}

impl OptimizationLoop {
    pub fn new(max_refinements: u32) -> Self {
        Self {
            max_refinements,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn max_refinements(&self) -> u32 {
        self.max_refinements
    }

    pub async fn run(
        &self,
        initial: ContextPackage,
        assessor: &dyn Assessor,
        refiner: &dyn Refiner,
    ) -> OptimizationResult {
        let started = Instant::now();

        let mut current = initial;
        let mut assessment = self.score(&mut current, assessor, 1);
        let mut history = vec![assessment.clone()];
        let mut best = (current.clone(), assessment.clone());
        let mut refinements = 0;

        while !assessment.can_proceed && refinements < self.max_refinements {
            refinements += 1;
            debug!(
                iteration = refinements,
                overall = assessment.overall(),
                missing = assessment.missing_information.len(),
                "Refining package"
            );
            let mut next = refiner.refine(&current, &assessment, refinements).await;
            assessment = self.score(&mut next, assessor, refinements + 1);
            history.push(assessment.clone());
            if assessment.overall() > best.1.overall() {
                best = (next.clone(), assessment.clone());
            }
            current = next;
        }

        let passes = refinements + 1;
        let (package, assessment) = best;
        info!(
            passes,
            best_overall = assessment.overall(),
            can_proceed = assessment.can_proceed,
            "Optimization finished"
        );
        self.publish(PipelineEvent::OptimizationFinished {
            passes,
            best_overall: assessment.overall(),
            can_proceed: assessment.can_proceed,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        OptimizationResult {
            package,
            assessment,
            passes,
            history,
        }
    }

    fn score(&self, package: &mut ContextPackage, assessor: &dyn Assessor, pass: u32) -> QualityAssessment {
        let assessment = assessor.assess(package);
        package.quality_report = assessment.clone();
        self.publish(PipelineEvent::QualityScored {
            package_id: package.id.clone(),
            pass,
            completeness: assessment.completeness(),
            feasibility: assessment.feasibility(),
            clarity: assessment.clarity(),
            overall: assessment.overall(),
            can_proceed: assessment.can_proceed,
            timestamp: Utc::now(),
        });
        assessment
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxforge_core::event::drain;
    use ctxforge_core::quality::Findings;
    use ctxforge_core::task::{Priority, TaskRequest, TaskType};
    use ctxforge_quality::suggestions::CLARIFY_REQUEST;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Replays a fixed list of (overall-driving completeness, can_proceed)
    /// pairs, one per pass; the last one repeats.
    struct ScriptedAssessor {
        script: Vec<(u8, bool)>,
        calls: Mutex<usize>,
    }

    impl ScriptedAssessor {
        fn new(script: Vec<(u8, bool)>) -> Self {
            Self {
                script,
                calls: Mutex::new(0),
            }
        }
    }

    impl Assessor for ScriptedAssessor {
        fn assess(&self, _package: &ContextPackage) -> QualityAssessment {
            let mut calls = self.calls.lock().unwrap();
            let (score, can_proceed) = self.script[(*calls).min(self.script.len() - 1)];
            *calls += 1;
            QualityAssessment::new(
                score,
                score,
                score,
                Findings {
                    can_proceed,
                    ..Default::default()
                },
            )
        }
    }

    struct NextRevision;

    #[async_trait]
    impl Refiner for NextRevision {
        async fn refine(&self, package: &ContextPackage, _: &QualityAssessment, _: u32) -> ContextPackage {
            package.next_revision()
        }
    }

    fn package() -> ContextPackage {
        ContextPackage::empty(&TaskRequest::new(TaskType::Feature, "add sso", Priority::High, "s1"))
    }

    #[test]
    fn suggestions_map_to_remediations() {
        assert_eq!(Remediation::from_suggestion(GATHER_KNOWLEDGE), Some(Remediation::RefetchKnowledge));
        assert_eq!(Remediation::from_suggestion(PRUNE_LOW_RELEVANCE), Some(Remediation::PruneLowRelevance));
        assert_eq!(Remediation::from_suggestion(REFRESH_MEMORY), Some(Remediation::RefreshMemory));
        assert_eq!(Remediation::from_suggestion(CLARIFY_REQUEST), None);
        assert_eq!(Remediation::from_suggestion("juggle"), None);
    }

    #[tokio::test]
    async fn stops_immediately_when_first_pass_proceeds() {
        let assessor = ScriptedAssessor::new(vec![(80, true)]);
        let result = OptimizationLoop::new(2).run(package(), &assessor, &NextRevision).await;
        assert_eq!(result.passes, 1);
        assert_eq!(result.package.revision, 0);
        assert_eq!(result.package.quality_report, result.assessment);
    }

    #[tokio::test]
    async fn keeps_best_when_refinement_regresses() {
        let bus = Arc::new(EventBus::new(32));
        let mut rx = bus.subscribe();
        let assessor = ScriptedAssessor::new(vec![(50, false), (70, false), (40, false)]);
        let result = OptimizationLoop::new(2)
            .with_events(Arc::clone(&bus))
            .run(package(), &assessor, &NextRevision)
            .await;

        assert_eq!(result.passes, 3);
        assert_eq!(result.history.len(), 3);
        assert_eq!(result.assessment.overall(), 70);
        assert_eq!(result.package.revision, 1);
        assert!(!result.assessment.can_proceed);

        let events = drain(&mut rx);
        assert_eq!(events.iter().filter(|e| e.name() == "quality_scored").count(), 3);
        assert_eq!(events.last().map(|e| e.name()), Some("optimization_finished"));
    }

    #[tokio::test]
    async fn ties_keep_the_earlier_package() {
        let assessor = ScriptedAssessor::new(vec![(60, false), (60, false)]);
        let result = OptimizationLoop::new(1).run(package(), &assessor, &NextRevision).await;
        assert_eq!(result.package.revision, 0);
    }

    #[tokio::test]
    async fn zero_refinements_scores_once() {
        let assessor = ScriptedAssessor::new(vec![(10, false)]);
        let result = OptimizationLoop::new(0).run(package(), &assessor, &NextRevision).await;
        assert_eq!(result.passes, 1);
    }

    proptest! {
        #[test]
        fn prop_terminates_and_returns_highest(
            script in prop::collection::vec((0u8..=100, any::<bool>()), 1..8),
            cap in 0u32..5,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let assessor = ScriptedAssessor::new(script);
            let result = runtime.block_on(OptimizationLoop::new(cap).run(package(), &assessor, &NextRevision));

            prop_assert!(result.passes <= cap + 1);
            prop_assert_eq!(result.history.len() as u32, result.passes);
            let highest = result.history.iter().map(|a| a.overall()).max().unwrap();
            prop_assert_eq!(result.assessment.overall(), highest);
            let first_at_highest = result.history.iter().position(|a| a.overall() == highest).unwrap();
            prop_assert_eq!(result.package.revision as usize, first_at_highest);
            let stopped_early = result.passes < cap + 1;
            if stopped_early {
                prop_assert!(result.history.last().unwrap().can_proceed);
            }
        }
    }
}
