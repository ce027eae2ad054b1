//! The assessor: a pure function from a package to a [`QualityAssessment`].

use crate::checkpoints::{MISSING_KNOWLEDGE, completeness};
use crate::clarity::clarity;
use crate::feasibility::feasibility;
use crate::suggestions::{
    CLARIFY_REQUEST, DEFAULT_STALE_AFTER_DAYS, GATHER_KNOWLEDGE, PRUNE_LOW_RELEVANCE, REFRESH_MEMORY,
    is_overloaded, is_stale,
};
use chrono::Duration;
use ctxforge_core::package::ContextPackage;
use ctxforge_core::quality::{Findings, QualityAssessment, overall_score};
use tracing::debug;

/// Minimum overall score for the quality gate.
pub const PROCEED_THRESHOLD: u8 = 60;

/// Scores a package. Implementations must not perform I/O.
pub trait Assessor: Send + Sync {
    fn assess(&self, package: &ContextPackage) -> QualityAssessment;
}

#[derive(Debug, Clone)]
pub struct QualityAssessor {
    stale_after: Duration,
}

impl QualityAssessor {
    pub fn new() -> Self {
        Self {
            stale_after: Duration::days(i64::from(DEFAULT_STALE_AFTER_DAYS)),
        }
    }

    pub fn with_stale_after_days(mut self, days: u32) -> Self {
        self.stale_after = Duration::days(i64::from(days));
        self
    }
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Assessor for QualityAssessor {
    fn assess(&self, package: &ContextPackage) -> QualityAssessment {
        let completeness = completeness(package);
        let feasibility = feasibility(package);
        let clarity = clarity(package);
        let overall = overall_score(completeness.score, feasibility.score, clarity.score);

        let mut suggestions = Vec::new();
        if completeness.missing.iter().any(|m| m == MISSING_KNOWLEDGE) || !feasibility.supported {
            suggestions.push(GATHER_KNOWLEDGE.to_string());
        }
        if is_overloaded(package) {
            suggestions.push(PRUNE_LOW_RELEVANCE.to_string());
        }
        if is_stale(package, self.stale_after) {
            suggestions.push(REFRESH_MEMORY.to_string());
        }
        if clarity.intent < 50 {
            suggestions.push(CLARIFY_REQUEST.to_string());
        }

        let mut issues = Vec::new();
        if !completeness.critical_missing.is_empty() {
            issues.push(format!(
                "Task-critical information missing: {}",
                completeness.critical_missing.join(", ")
            ));
        }
        if !feasibility.supported {
            issues.push(format!(
                "Context support {} is below 70% of estimated complexity {}",
                feasibility.support, feasibility.complexity
            ));
        }
        if feasibility.tool_coverage < 1.0 {
            issues.push(format!(
                "Only {:.0}% of the tools this task benefits from are available",
                feasibility.tool_coverage * 100.0
            ));
        }
        if !package.warnings.is_empty() {
            issues.push(format!("{} source(s) degraded during assembly", package.warnings.len()));
        }

        let can_proceed = overall >= PROCEED_THRESHOLD
            && completeness.critical_missing.is_empty()
            && feasibility.supported;

        let mut blockers = Vec::new();
        if overall < PROCEED_THRESHOLD {
            blockers.push(format!("overall score below {PROCEED_THRESHOLD}"));
        }
        if !completeness.critical_missing.is_empty() {
            blockers.push(format!("missing {}", completeness.critical_missing.join(", ")));
        }
        if !feasibility.supported {
            blockers.push("insufficient context support".to_string());
        }
        let verdict = if can_proceed {
            "ready to proceed".to_string()
        } else {
            format!("not ready: {}", blockers.join("; "))
        };
        let rationale = format!(
            "completeness {}, feasibility {}, clarity {} -> overall {overall}; {verdict}",
            completeness.score, feasibility.score, clarity.score
        );

        debug!(
            package_id = %package.id,
            completeness = completeness.score,
            feasibility = feasibility.score,
            clarity = clarity.score,
            overall,
            can_proceed,
            "Package assessed"
        );

        QualityAssessment::new(
            completeness.score,
            feasibility.score,
            clarity.score,
            Findings {
                missing_information: completeness.missing,
                potential_issues: issues,
                optimization_suggestions: suggestions,
                can_proceed,
                rationale,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxforge_core::knowledge::{KnowledgeItem, KnowledgeKind, SourceKind};
    use ctxforge_core::project::ProjectContext;
    use ctxforge_core::quality::Confidence;
    use ctxforge_core::task::{Priority, TaskRequest, TaskType};
    use ctxforge_core::tool::ToolDescriptor;

    fn item(title: &str, relevance: f32) -> KnowledgeItem {
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

    fn tools(names: &[&str]) -> Vec<ToolDescriptor> {
        names.iter().map(|n| ToolDescriptor::new(*n, "")).collect()
    }

    fn instructions() -> Vec<String> {
        vec!["Ground every statement in the supplied context.".into(); 5]
    }

    #[test]
    fn bare_bugfix_cannot_proceed() {
        let mut pkg = ContextPackage::empty(&TaskRequest::new(
            TaskType::Bugfix,
            "fix null pointer in login",
            Priority::High,
            "s1",
        ));
        pkg.system_instructions = instructions();
        pkg.available_tools = tools(&["project_context", "session_memory", "quality_assessment"]);

        let assessment = QualityAssessor::new().assess(&pkg);
        assert!(!assessment.can_proceed);
        assert!(assessment
            .missing_information
            .iter()
            .any(|m| m.contains("reproduce")));
        assert!(assessment
            .optimization_suggestions
            .contains(&GATHER_KNOWLEDGE.to_string()));
        assert_eq!(assessment.confidence, Confidence::Low);
        assert!(assessment.rationale.contains("not ready"));
        assert_eq!(
            assessment.overall(),
            overall_score(assessment.completeness(), assessment.feasibility(), assessment.clarity())
        );
    }

    #[test]
    fn well_supported_progress_can_proceed() {
        let mut pkg = ContextPackage::empty(&TaskRequest::new(
            TaskType::Progress,
            "summarize progress on the login milestone for the weekly report",
            Priority::Medium,
            "s1",
        ));
        pkg.system_instructions = instructions();
        pkg.available_tools = tools(&["project_context", "session_memory", "quality_assessment"]);
        pkg.project_context = ProjectContext {
            goals: vec!["Ship login".into()],
            architecture: "Axum service with Postgres".into(),
            key_features: vec!["OAuth".into()],
            recent_changes: vec!["Added token refresh".into()],
            completed_tasks: vec!["Session store".into()],
            pending_tasks: vec!["Password reset".into()],
            decisions: vec!["Use JWT".into()],
            ..Default::default()
        };
        pkg.relevant_knowledge = vec![item("Login milestone", 0.9), item("Weekly report", 0.8)];

        let assessment = QualityAssessor::new().assess(&pkg);
        assert!(assessment.can_proceed, "{}", assessment.rationale);
        assert!(assessment.overall() >= 85);
        assert!(assessment.missing_information.is_empty());
        assert_eq!(assessment.confidence, Confidence::High);
    }

    #[test]
    fn assessment_is_deterministic() {
        let pkg = ContextPackage::empty(&TaskRequest::new(TaskType::Feature, "add sso", Priority::Low, "s"));
        let assessor = QualityAssessor::new();
        assert_eq!(assessor.assess(&pkg), assessor.assess(&pkg));
    }

    #[test]
    fn vague_request_asks_for_clarification() {
        let pkg = ContextPackage::empty(&TaskRequest::new(TaskType::General, "login", Priority::Low, "s"));
        let assessment = QualityAssessor::new().assess(&pkg);
        assert!(assessment
            .optimization_suggestions
            .contains(&CLARIFY_REQUEST.to_string()));
    }
}
