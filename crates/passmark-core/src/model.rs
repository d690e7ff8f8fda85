//! Core data model types for passmark.
//!
//! Assessments, categories, and the per-subject grading scale. These are the
//! read-only inputs every calculation works from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A gradable course item, graded or still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier for this assessment.
    pub id: String,
    /// Subject the assessment belongs to.
    pub subject_id: String,
    /// Category the assessment is grouped under, if any.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Recorded score. `None` means the assessment is still pending.
    #[serde(default)]
    pub value: Option<Decimal>,
    /// Scale the raw score is recorded on.
    pub max_value: Decimal,
    /// Share (0-100) within its category, or of the subject when uncategorized.
    pub weight: Decimal,
    /// Kind of assessment.
    #[serde(default)]
    pub kind: AssessmentKind,
    /// Human-readable label.
    #[serde(default)]
    pub description: Option<String>,
}

impl Assessment {
    /// Returns `true` if no score has been recorded yet.
    pub fn is_pending(&self) -> bool {
        self.value.is_none()
    }
}

/// Kind tag carried by every assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Exam,
    Homework,
    Project,
    Participation,
    #[default]
    Other,
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentKind::Exam => write!(f, "exam"),
            AssessmentKind::Homework => write!(f, "homework"),
            AssessmentKind::Project => write!(f, "project"),
            AssessmentKind::Participation => write!(f, "participation"),
            AssessmentKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for AssessmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exam" => Ok(AssessmentKind::Exam),
            "homework" => Ok(AssessmentKind::Homework),
            "project" => Ok(AssessmentKind::Project),
            "participation" => Ok(AssessmentKind::Participation),
            "other" => Ok(AssessmentKind::Other),
            other => Err(format!("unknown assessment kind: {other}")),
        }
    }
}

/// A weighted grouping of assessments within a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    /// Share (0-100) of the subject total.
    pub weight: Decimal,
}

/// Grading-scale parameters for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub subject_id: String,
    pub min_grade: Decimal,
    pub passing_grade: Decimal,
    pub max_grade: Decimal,
    #[serde(default)]
    pub scale: GradeScale,
}

impl SubjectConfig {
    /// Build a config from one of the preset scales.
    pub fn from_scale(subject_id: impl Into<String>, scale: GradeScale) -> Self {
        let (min_grade, passing_grade, max_grade) = scale.bounds();
        Self {
            subject_id: subject_id.into(),
            min_grade,
            passing_grade,
            max_grade,
            scale,
        }
    }

    /// Checks that `min < max` and that the passing grade lies within them.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_grade >= self.max_grade {
            return Err(format!(
                "min grade {} must be below max grade {}",
                self.min_grade, self.max_grade
            ));
        }
        if self.passing_grade < self.min_grade || self.passing_grade > self.max_grade {
            return Err(format!(
                "passing grade {} must lie within [{}, {}]",
                self.passing_grade, self.min_grade, self.max_grade
            ));
        }
        Ok(())
    }
}

/// Known grading scales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeScale {
    /// 1.0 - 7.0, passing at 4.0.
    Chilean,
    /// 0 - 100, passing at 55.
    Utfsm,
    /// 1.0 - 10.0, passing at 5.0.
    European,
    /// 0 - 100, passing at 60 unless overridden.
    #[default]
    Custom,
}

impl GradeScale {
    /// All preset scales, in display order.
    pub const ALL: [GradeScale; 4] = [
        GradeScale::Chilean,
        GradeScale::Utfsm,
        GradeScale::European,
        GradeScale::Custom,
    ];

    /// `(min, passing, max)` for the preset.
    pub fn bounds(self) -> (Decimal, Decimal, Decimal) {
        match self {
            GradeScale::Chilean => (Decimal::ONE, Decimal::from(4), Decimal::from(7)),
            GradeScale::Utfsm => (Decimal::ZERO, Decimal::from(55), Decimal::ONE_HUNDRED),
            GradeScale::European => (Decimal::ONE, Decimal::from(5), Decimal::TEN),
            GradeScale::Custom => (Decimal::ZERO, Decimal::from(60), Decimal::ONE_HUNDRED),
        }
    }

    /// Human-readable name including the range.
    pub fn label(self) -> &'static str {
        match self {
            GradeScale::Chilean => "Chilean (1.0 - 7.0)",
            GradeScale::Utfsm => "UTFSM (0 - 100)",
            GradeScale::European => "European (1.0 - 10.0)",
            GradeScale::Custom => "Custom",
        }
    }
}

impl fmt::Display for GradeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeScale::Chilean => write!(f, "chilean"),
            GradeScale::Utfsm => write!(f, "utfsm"),
            GradeScale::European => write!(f, "european"),
            GradeScale::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for GradeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chilean" | "chile" => Ok(GradeScale::Chilean),
            "utfsm" => Ok(GradeScale::Utfsm),
            "european" | "eu" => Ok(GradeScale::European),
            "custom" => Ok(GradeScale::Custom),
            other => Err(format!("unknown grade scale: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scale_display_and_parse() {
        assert_eq!(GradeScale::Chilean.to_string(), "chilean");
        assert_eq!("UTFSM".parse::<GradeScale>().unwrap(), GradeScale::Utfsm);
        assert_eq!("eu".parse::<GradeScale>().unwrap(), GradeScale::European);
        assert!("american".parse::<GradeScale>().is_err());
    }

    #[test]
    fn config_from_chilean_scale() {
        let config = SubjectConfig::from_scale("calc-1", GradeScale::Chilean);
        assert_eq!(config.min_grade, dec!(1));
        assert_eq!(config.passing_grade, dec!(4));
        assert_eq!(config.max_grade, dec!(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation_rejects_inverted_range() {
        let mut config = SubjectConfig::from_scale("calc-1", GradeScale::Chilean);
        config.min_grade = dec!(7);
        config.max_grade = dec!(1);
        assert!(config.validate().is_err());

        let mut config = SubjectConfig::from_scale("calc-1", GradeScale::Chilean);
        config.passing_grade = dec!(8);
        assert!(config.validate().unwrap_err().contains("passing grade"));
    }

    #[test]
    fn assessment_serde_roundtrip_keeps_pending() {
        let assessment = Assessment {
            id: "a1".into(),
            subject_id: "calc-1".into(),
            category_id: None,
            value: None,
            max_value: dec!(7),
            weight: dec!(40),
            kind: AssessmentKind::Exam,
            description: Some("Midterm".into()),
        };
        let json = serde_json::to_string(&assessment).unwrap();
        let back: Assessment = serde_json::from_str(&json).unwrap();
        assert!(back.is_pending());
        assert_eq!(back.kind, AssessmentKind::Exam);
        assert_eq!(back.weight, dec!(40));
    }
}
