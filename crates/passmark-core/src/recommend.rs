//! Recommendation classifier: risk labels and advice lines.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::SubjectConfig;
use crate::results::{Diagnostic, RequiredGrade, RiskLevel};

/// Label a required value by how demanding it is on the subject scale.
pub fn classify_risk(value: Decimal, achievable: bool, config: &SubjectConfig) -> RiskLevel {
    if !achievable {
        RiskLevel::Unreachable
    } else if value >= config.max_grade * dec!(0.9) {
        RiskLevel::VeryHigh
    } else if value >= config.passing_grade * dec!(1.2) {
        RiskLevel::High
    } else if value >= config.passing_grade {
        RiskLevel::Moderate
    } else if value > config.min_grade {
        RiskLevel::Low
    } else {
        RiskLevel::VeryLow
    }
}

/// One overall status line followed by one line per required grade.
///
/// An already passed subject gets the status line only.
pub fn recommendations(
    required: &[RequiredGrade],
    already_passed: bool,
    can_pass: bool,
    diagnostic: Option<&Diagnostic>,
) -> Vec<String> {
    if already_passed {
        return vec!["You have already passed this subject; no further grades are needed.".into()];
    }

    let mut lines = Vec::with_capacity(required.len() + 1);
    if can_pass {
        lines.push("You can pass this subject by meeting the required grades.".into());
    } else {
        let reason = diagnostic
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        lines.push(format!(
            "You cannot pass this subject with the remaining assessments{reason}. \
             Consider improving pending work or talking to your instructor."
        ));
    }

    lines.extend(required.iter().map(advice_line));
    lines
}

fn advice_line(required: &RequiredGrade) -> String {
    match required.risk {
        RiskLevel::Unreachable => format!("Unreachable: {}", required.description),
        risk => format!("{}: {risk} risk", required.description),
    }
}
