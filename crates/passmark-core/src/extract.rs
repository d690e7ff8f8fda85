//! Result extraction: solver assignment → per-assessment required grades.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::constraints::{GradeContext, PendingItem};
use crate::contribution::display_value;
use crate::lp::LpSolution;
use crate::model::SubjectConfig;
use crate::recommend::classify_risk;
use crate::results::RequiredGrade;

/// Decimal places kept from solver output.
pub const SOLUTION_DP: u32 = 9;

/// Convert a solver value to the decimal domain.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(SOLUTION_DP, RoundingStrategy::MidpointAwayFromZero))
}

/// Raw solved value per pending item, in `ctx.pending` order.
///
/// Items left out of the LP (zero weight) are reported at `min_grade`.
/// Returns `None` unless the solution is optimal and assigns every grade variable.
pub fn solved_values(ctx: &GradeContext, solution: &LpSolution) -> Option<Vec<Decimal>> {
    if !solution.is_optimal() {
        return None;
    }
    ctx.pending
        .iter()
        .map(|item| {
            if !item.contributes() {
                return Some(ctx.config.min_grade);
            }
            let value = solution.value(&item.var_name).and_then(to_decimal);
            if value.is_none() {
                tracing::warn!(variable = %item.var_name, "solver returned no value for variable");
            }
            value
        })
        .collect()
}

/// `min_grade ≤ value ≤ max_grade`.
pub fn is_achievable(value: Decimal, config: &SubjectConfig) -> bool {
    value >= config.min_grade && value <= config.max_grade
}

/// Human-readable requirement line for one item.
pub fn describe(item: &PendingItem, value: Decimal) -> String {
    let category = item
        .category
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("uncategorized");
    format!(
        "{:.1} needed on \"{}\" ({})",
        display_value(value),
        item.label,
        category
    )
}

/// Build required grades from raw solved values and their presented values.
///
/// Achievability is judged on the raw value; the presented value is what
/// gets reported (usually the balanced one).
pub fn required_grades(
    ctx: &GradeContext,
    raw: &[Decimal],
    presented: &[Decimal],
) -> Vec<RequiredGrade> {
    ctx.pending
        .iter()
        .zip(raw.iter().zip(presented))
        .map(|(item, (&raw, &value))| {
            let achievable = is_achievable(raw, &ctx.config);
            RequiredGrade {
                assessment_id: item.assessment.id.clone(),
                category_id: item.category.as_ref().map(|c| c.id.clone()),
                category_name: item.category.as_ref().map(|c| c.name.clone()),
                required_value: value,
                description: describe(item, value),
                achievable,
                risk: classify_risk(value, achievable, &ctx.config),
            }
        })
        .collect()
}
