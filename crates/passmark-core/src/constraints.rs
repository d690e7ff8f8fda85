//! Constraint builder: turns pending assessments into an LP model.
//!
//! Every pending assessment with a non-zero effective weight becomes one
//! decision variable. The shared feasibility constraint is
//! `Σ wᵢ·xᵢ ≥ required_gap`; the objective depends on the [`Method`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contribution::{current_grade, effective_weight, CategoryIndex, Normalization};
use crate::error::CalculationError;
use crate::lp::{LpModel, Relation, VarId};
use crate::model::{Assessment, AssessmentKind, Category, SubjectConfig};

/// Objective variant used to pick required grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Minimise the weighted sum of pending grades.
    MinSum,
    /// Pull every pending grade toward the common implied passing target.
    MinDistanceToPassingGap,
    /// Pull every pending grade toward the maximum grade. Used as fallback.
    MinDistanceToMax,
}

impl Method {
    pub const ALL: [Method; 3] = [
        Method::MinSum,
        Method::MinDistanceToPassingGap,
        Method::MinDistanceToMax,
    ];
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::MinSum => write!(f, "min_sum"),
            Method::MinDistanceToPassingGap => write!(f, "min_distance_to_passing_gap"),
            Method::MinDistanceToMax => write!(f, "min_distance_to_max"),
        }
    }
}

impl FromStr for Method {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min_sum" | "lp_min" => Ok(Method::MinSum),
            "min_distance_to_passing_gap" | "lp_min_passing_distance" => {
                Ok(Method::MinDistanceToPassingGap)
            }
            "min_distance_to_max" | "lp_loss_distance" => Ok(Method::MinDistanceToMax),
            _ => Err(CalculationError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Variable domain used when building the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Each grade variable lies in `[min_grade, max_grade]`.
    Bounded,
    /// Grade variables are free; used to tell "capped by max grade" apart
    /// from "unreachable regardless of bounds".
    Unbounded,
}

/// A pending assessment prepared for the LP.
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub assessment: Assessment,
    pub category: Option<Category>,
    /// Effective weight `wᵢ` in the subject total.
    pub coefficient: Decimal,
    /// Name of the decision variable in the model.
    pub var_name: String,
    /// Label used in descriptions.
    pub label: String,
}

impl PendingItem {
    /// Zero-weight items cannot move the grade and are left out of the LP.
    pub fn contributes(&self) -> bool {
        self.coefficient > Decimal::ZERO
    }
}

/// Everything the builder and the balancer need about one subject.
#[derive(Debug, Clone)]
pub struct GradeContext {
    pub config: SubjectConfig,
    pub current_grade: Decimal,
    /// `passing_grade − current_grade`.
    pub required_gap: Decimal,
    pub pending: Vec<PendingItem>,
}

impl GradeContext {
    pub fn new(
        assessments: &[Assessment],
        categories: &[Category],
        config: &SubjectConfig,
        normalization: Normalization,
        fill_empty_categories: bool,
    ) -> Self {
        let index = CategoryIndex::new(categories);
        let current = current_grade(assessments, &index, config, normalization);

        let mut pending_assessments: Vec<Assessment> =
            assessments.iter().filter(|a| a.is_pending()).cloned().collect();
        if fill_empty_categories {
            pending_assessments.extend(placeholders_for_empty_categories(assessments, categories));
        }

        let pending = pending_assessments
            .into_iter()
            .enumerate()
            .map(|(i, assessment)| {
                let category = index.category_of(&assessment).cloned();
                let coefficient = effective_weight(&assessment, &index);
                let label = assessment
                    .description
                    .clone()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("Assessment {}", i + 1));
                PendingItem {
                    assessment,
                    category,
                    coefficient,
                    var_name: format!("grade_{i}"),
                    label,
                }
            })
            .collect();

        Self {
            config: config.clone(),
            current_grade: current,
            required_gap: config.passing_grade - current,
            pending,
        }
    }

    /// `Σ wᵢ` over pending items.
    pub fn total_pending_weight(&self) -> Decimal {
        self.pending.iter().map(|p| p.coefficient).sum()
    }

    /// `current + Σ wᵢ·valueᵢ`, values in `pending` order.
    pub fn projected(&self, values: &[Decimal]) -> Decimal {
        self.current_grade
            + self
                .pending
                .iter()
                .zip(values)
                .map(|(p, v)| p.coefficient * v)
                .sum::<Decimal>()
    }

    /// Grade reached if every pending item scores `max_grade`.
    pub fn maximum_attainable(&self) -> Decimal {
        self.current_grade + self.config.max_grade * self.total_pending_weight()
    }

    /// The single grade that, scored on every pending item, closes the gap
    /// exactly: `required_gap / Σ wᵢ`. `None` when nothing pending carries weight.
    pub fn implied_target(&self) -> Option<Decimal> {
        let total = self.total_pending_weight();
        if total > Decimal::ZERO {
            Some(self.required_gap / total)
        } else {
            None
        }
    }
}

/// A synthetic pending assessment for each weighted category with nothing recorded.
fn placeholders_for_empty_categories(
    assessments: &[Assessment],
    categories: &[Category],
) -> Vec<Assessment> {
    categories
        .iter()
        .filter(|c| c.weight > Decimal::ZERO)
        .filter(|c| {
            !assessments
                .iter()
                .any(|a| a.category_id.as_deref() == Some(c.id.as_str()))
        })
        .map(|c| Assessment {
            id: format!("placeholder-{}", c.id),
            subject_id: c.subject_id.clone(),
            category_id: Some(c.id.clone()),
            value: None,
            max_value: Decimal::ONE_HUNDRED,
            weight: Decimal::ONE_HUNDRED,
            kind: AssessmentKind::Other,
            description: Some(format!("Missing assessment in {}", c.name)),
        })
        .collect()
}

/// What the builder decided for a context.
#[derive(Debug, Clone)]
pub enum Formulation {
    /// No pending assessments; the outcome is already decided.
    NothingPending,
    /// Known scores alone reach the passing grade.
    AlreadySecured,
    /// A positive gap but no pending item carries weight.
    Unreachable,
    /// An LP to hand to the solver.
    Model(LpModel),
}

/// Formulate the LP for `method`, or short-circuit when no LP is needed.
pub fn build(ctx: &GradeContext, method: Method, domain: Domain) -> Formulation {
    if ctx.pending.is_empty() {
        return Formulation::NothingPending;
    }
    if ctx.required_gap <= Decimal::ZERO {
        return Formulation::AlreadySecured;
    }
    if !ctx.pending.iter().any(PendingItem::contributes) {
        return Formulation::Unreachable;
    }

    let min = to_f64(ctx.config.min_grade);
    let max = to_f64(ctx.config.max_grade);
    let (lower, upper) = match domain {
        Domain::Bounded => (Some(min), Some(max)),
        Domain::Unbounded => (None, None),
    };

    let mut model = LpModel::new(format!("{}:{}", ctx.config.subject_id, method));

    let grade_vars: Vec<(VarId, f64)> = ctx
        .pending
        .iter()
        .filter(|p| p.contributes())
        .map(|p| {
            let id = model.add_variable(p.var_name.clone(), lower, upper);
            (id, to_f64(p.coefficient))
        })
        .collect();

    model.add_constraint(
        "passing_gap",
        grade_vars.clone(),
        Relation::GreaterOrEqual,
        to_f64(ctx.required_gap),
    );

    match method {
        Method::MinSum => model.minimise(grade_vars),
        Method::MinDistanceToPassingGap => {
            let target = ctx.implied_target().unwrap_or(ctx.required_gap);
            pin_distances(&mut model, &grade_vars, to_f64(target));
        }
        Method::MinDistanceToMax => pin_distances(&mut model, &grade_vars, max),
    }

    tracing::debug!(
        model = %model.name,
        variables = model.variables.len(),
        constraints = model.constraints.len(),
        "built LP model"
    );

    Formulation::Model(model)
}

/// Add `dᵢ ≥ 0` with `xᵢ − dᵢ = target` per grade variable and minimise `Σ dᵢ`.
fn pin_distances(model: &mut LpModel, grade_vars: &[(VarId, f64)], target: f64) {
    let mut distances = Vec::with_capacity(grade_vars.len());
    for (grade, _) in grade_vars {
        let grade_name = model.variable(*grade).name.clone();
        let distance = model.add_variable(format!("distance_{grade_name}"), Some(0.0), None);
        model.add_constraint(
            format!("pin_{grade_name}"),
            vec![(*grade, 1.0), (distance, -1.0)],
            Relation::Equal,
            target,
        );
        distances.push((distance, 1.0));
    }
    model.minimise(distances);
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
