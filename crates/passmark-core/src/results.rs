//! Calculation result types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constraints::Method;
use crate::contribution::display_value;

/// Pass/fail state of a subject, derived per calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectStatus {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "fail")]
    Fail,
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectStatus::Pass => write!(f, "pass"),
            SubjectStatus::InProgress => write!(f, "in progress"),
            SubjectStatus::Fail => write!(f, "fail"),
        }
    }
}

/// How hard a required value is to hit, relative to the subject scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    Unreachable,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::VeryLow => write!(f, "very low"),
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::VeryHigh => write!(f, "very high"),
            RiskLevel::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Non-fatal condition explaining an unusual result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The subject has no grading scale configured.
    MissingConfiguration,
    /// The subject has no assessments recorded.
    NoAssessments,
    /// The configured scale is inconsistent.
    InvalidConfiguration(String),
    /// The LP backend could not be initialized.
    SolverUnavailable(String),
    /// The LP backend failed or timed out while solving.
    SolverFailure(String),
    /// Passing needs grades above the scale maximum.
    CappedByMaxGrade,
    /// No assignment of pending grades reaches the passing grade.
    UnreachableRegardlessOfBounds,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingConfiguration => write!(f, "subject has no grading configuration"),
            Diagnostic::NoAssessments => write!(f, "subject has no assessments"),
            Diagnostic::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Diagnostic::SolverUnavailable(msg) => write!(f, "solver unavailable: {msg}"),
            Diagnostic::SolverFailure(msg) => write!(f, "solver failure: {msg}"),
            Diagnostic::CappedByMaxGrade => {
                write!(f, "passing requires grades above the maximum of the scale")
            }
            Diagnostic::UnreachableRegardlessOfBounds => {
                write!(f, "passing grade is unreachable with the remaining assessments")
            }
        }
    }
}

/// Target value for one pending assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredGrade {
    pub assessment_id: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub required_value: Decimal,
    pub description: String,
    /// Whether `required_value` lies within `[min_grade, max_grade]`.
    pub achievable: bool,
    pub risk: RiskLevel,
}

impl RequiredGrade {
    pub fn display_value(&self) -> f64 {
        display_value(self.required_value)
    }
}

/// Where the subject lands if every required value is met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeProjection {
    /// `current + Σ wᵢ·requiredᵢ`.
    pub projected: Decimal,
    /// Grade if every pending item scores the maximum.
    pub maximum_attainable: Decimal,
    /// The passing grade.
    pub target: Decimal,
}

/// Outcome of one subject calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCalculationResult {
    pub subject_id: String,
    pub current_grade: Decimal,
    pub can_pass: bool,
    pub status: SubjectStatus,
    pub required_grades: Vec<RequiredGrade>,
    pub recommendations: Vec<String>,
    pub calculated_at: DateTime<Utc>,
    pub method: Method,
    #[serde(default)]
    pub fallback_applied: bool,
    #[serde(default)]
    pub projection: Option<GradeProjection>,
    #[serde(default)]
    pub diagnostic: Option<Diagnostic>,
}

impl GradeCalculationResult {
    /// A result that only carries guidance: nothing was computed.
    pub fn guidance(
        subject_id: impl Into<String>,
        method: Method,
        diagnostic: Diagnostic,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            current_grade: Decimal::ZERO,
            can_pass: false,
            status: SubjectStatus::InProgress,
            required_grades: Vec::new(),
            recommendations: vec![message.into()],
            calculated_at: Utc::now(),
            method,
            fallback_applied: false,
            projection: None,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn current_grade_display(&self) -> f64 {
        display_value(self.current_grade)
    }

    /// Required grades that fall outside the subject scale.
    pub fn unreachable(&self) -> impl Iterator<Item = &RequiredGrade> {
        self.required_grades.iter().filter(|r| !r.achievable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_serializes_with_space() {
        let json = serde_json::to_string(&SubjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
        let back: SubjectStatus = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(back, SubjectStatus::Fail);
    }

    #[test]
    fn guidance_result_is_in_progress() {
        let result = GradeCalculationResult::guidance(
            "calc-1",
            Method::MinSum,
            Diagnostic::MissingConfiguration,
            "Configure a grading scale",
        );
        assert_eq!(result.status, SubjectStatus::InProgress);
        assert!(!result.can_pass);
        assert!(result.required_grades.is_empty());
        assert_eq!(result.recommendations.len(), 1);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["diagnostic"]["kind"], "missing_configuration");
        assert_eq!(json["method"], "min_sum");
    }

    #[test]
    fn required_grade_display_rounds() {
        let required = RequiredGrade {
            assessment_id: "a".into(),
            category_id: None,
            category_name: None,
            required_value: dec!(4.05),
            description: String::new(),
            achievable: true,
            risk: RiskLevel::Moderate,
        };
        assert_eq!(required.display_value(), 4.1);
    }

    #[test]
    fn risk_levels_order_by_difficulty() {
        assert!(RiskLevel::VeryLow < RiskLevel::Moderate);
        assert!(RiskLevel::VeryHigh < RiskLevel::Unreachable);
        assert_eq!(RiskLevel::VeryHigh.to_string(), "very high");
    }
}
