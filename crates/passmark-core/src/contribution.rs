//! Weighted contribution arithmetic.
//!
//! An assessment contributes `normalized × weight/100 × category factor` to
//! the subject grade, where the category factor is `category.weight/100`, or
//! 1.0 when the assessment has no (known) category. Everything here is exact
//! decimal arithmetic; floats only appear in [`display_value`].

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::model::{Assessment, Category, SubjectConfig};

/// How recorded scores are mapped onto the subject scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `(value / max_value) × max_grade`.
    #[default]
    ScaleByMaxValue,
    /// Values are already on the subject scale and used as-is.
    OnScale,
}

/// Lookup of a subject's categories by id.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex<'a> {
    by_id: HashMap<&'a str, &'a Category>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }

    /// The category an assessment points at, if it exists.
    pub fn category_of(&self, assessment: &Assessment) -> Option<&'a Category> {
        assessment
            .category_id
            .as_deref()
            .and_then(|id| self.by_id.get(id).copied())
    }

    /// `category.weight / 100`, or 1.0 for uncategorized assessments.
    pub fn factor(&self, assessment: &Assessment) -> Decimal {
        match self.category_of(assessment) {
            Some(category) => category.weight / Decimal::ONE_HUNDRED,
            None => Decimal::ONE,
        }
    }
}

/// Map a recorded value onto the subject scale.
pub fn normalized_value(
    assessment: &Assessment,
    value: Decimal,
    config: &SubjectConfig,
    normalization: Normalization,
) -> Decimal {
    match normalization {
        Normalization::OnScale => value,
        Normalization::ScaleByMaxValue => {
            if assessment.max_value <= Decimal::ZERO {
                tracing::warn!(
                    assessment = %assessment.id,
                    max_value = %assessment.max_value,
                    "non-positive max value, treating score as on-scale"
                );
                return value;
            }
            // Multiply first so exact ratios such as 5/7 × 7 stay exact.
            value * config.max_grade / assessment.max_value
        }
    }
}

/// Effective weight of an assessment in the subject total.
pub fn effective_weight(assessment: &Assessment, categories: &CategoryIndex<'_>) -> Decimal {
    assessment.weight / Decimal::ONE_HUNDRED * categories.factor(assessment)
}

/// Contribution of a graded assessment, or `None` if it is still pending.
pub fn contribution(
    assessment: &Assessment,
    categories: &CategoryIndex<'_>,
    config: &SubjectConfig,
    normalization: Normalization,
) -> Option<Decimal> {
    let value = assessment.value?;
    let normalized = normalized_value(assessment, value, config, normalization);
    Some(normalized * effective_weight(assessment, categories))
}

/// Sum of contributions from every graded assessment.
pub fn current_grade(
    assessments: &[Assessment],
    categories: &CategoryIndex<'_>,
    config: &SubjectConfig,
    normalization: Normalization,
) -> Decimal {
    assessments
        .iter()
        .filter_map(|a| contribution(a, categories, config, normalization))
        .sum()
}

/// Round half-up to one decimal place.
pub fn round_one_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Presentation conversion: one decimal place, half-up, as `f64`.
pub fn display_value(value: Decimal) -> f64 {
    round_one_decimal(value).to_f64().unwrap_or_default()
}
