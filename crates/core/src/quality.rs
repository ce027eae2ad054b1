//! Quality assessment result and the fixed overall-score formula.
//!
//! `overall = round(0.4·completeness + 0.35·feasibility + 0.25·clarity)`.
//! The sub-scores and overall score are private so that the only way to
//! obtain an assessment is through a constructor that applies the formula.

use serde::{Deserialize, Serialize};

pub const COMPLETENESS_WEIGHT: f64 = 0.40;
pub const FEASIBILITY_WEIGHT: f64 = 0.35;
pub const CLARITY_WEIGHT: f64 = 0.25;

/// The weighted overall score for three 0–100 sub-scores.
pub fn overall_score(completeness: u8, feasibility: u8, clarity: u8) -> u8 {
    let weighted = COMPLETENESS_WEIGHT * f64::from(completeness.min(100))
        + FEASIBILITY_WEIGHT * f64::from(feasibility.min(100))
        + CLARITY_WEIGHT * f64::from(clarity.min(100));
    weighted.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// High: overall ≥ 85 with at most one gap. Medium: overall ≥ 70 with
    /// at most three gaps. Low otherwise.
    pub fn tier(overall: u8, missing: usize) -> Self {
        if overall >= 85 && missing <= 1 {
            Self::High
        } else if overall >= 70 && missing <= 3 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Advisory output of a scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub missing_information: Vec<String>,
    pub potential_issues: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    pub can_proceed: bool,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssessment {
    completeness: u8,
    feasibility: u8,
    clarity: u8,
    overall: u8,
    pub confidence: Confidence,
    pub missing_information: Vec<String>,
    pub potential_issues: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    pub can_proceed: bool,
    pub rationale: String,
}

impl QualityAssessment {
    pub fn new(completeness: u8, feasibility: u8, clarity: u8, findings: Findings) -> Self {
        let completeness = completeness.min(100);
        let feasibility = feasibility.min(100);
        let clarity = clarity.min(100);
        let overall = overall_score(completeness, feasibility, clarity);
        Self {
            completeness,
            feasibility,
            clarity,
            overall,
            confidence: Confidence::tier(overall, findings.missing_information.len()),
            missing_information: findings.missing_information,
            potential_issues: findings.potential_issues,
            optimization_suggestions: findings.optimization_suggestions,
            can_proceed: findings.can_proceed,
            rationale: findings.rationale,
        }
    }

    pub fn from_scores(completeness: u8, feasibility: u8, clarity: u8) -> Self {
        Self::new(completeness, feasibility, clarity, Findings::default())
    }

    /// Placeholder carried by a package before its first scoring pass.
    pub fn unscored() -> Self {
        Self::new(
            0,
            0,
            0,
            Findings {
                rationale: "not yet assessed".into(),
                ..Default::default()
            },
        )
    }

    pub fn completeness(&self) -> u8 {
        self.completeness
    }

    pub fn feasibility(&self) -> u8 {
        self.feasibility
    }

    pub fn clarity(&self) -> u8 {
        self.clarity
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }
}
