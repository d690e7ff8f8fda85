//! Balancer: spreads an LP optimum into a more even set of targets.
//!
//! LP optima sit on vertices, so a raw solution often asks for the maximum on
//! one item and the minimum on another. Each value is blended toward the
//! common average `gap / Σwᵢ`, clamped to the scale, and then a single
//! correction pass adds back any contribution the blend lost. The correction
//! is not iterated: when many values clamp at once a residual shortfall can
//! remain, and `can_pass` is computed from the balanced values as they are.
//!
//! By default the blended term is each item's proportional share of the gap,
//! `gap · (wᵢ / Σw) / wᵢ`, so the output does not depend on which vertex the
//! solver landed on. [`BlendSource::LpSolution`] blends the solver value
//! itself instead.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constraints::GradeContext;

/// Decimal places kept in balanced values.
const BALANCE_DP: u32 = 6;

/// What the `lp_share` part of the blend is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendSource {
    /// The item's proportional share of the gap.
    #[default]
    ProportionalShare,
    /// The raw solver value for the item.
    LpSolution,
}

/// Blend factors between the LP value and the common average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancerConfig {
    #[serde(default = "default_lp_share")]
    pub lp_share: Decimal,
    #[serde(default = "default_average_share")]
    pub average_share: Decimal,
    #[serde(default)]
    pub blend_source: BlendSource,
}

fn default_lp_share() -> Decimal {
    dec!(0.6)
}

fn default_average_share() -> Decimal {
    dec!(0.4)
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            lp_share: default_lp_share(),
            average_share: default_average_share(),
            blend_source: BlendSource::default(),
        }
    }
}

/// Balance raw values (in `ctx.pending` order). Output has the same length
/// and every value lies in `[min_grade, max_grade]`.
pub fn balance(ctx: &GradeContext, raw: &[Decimal], config: &BalancerConfig) -> Vec<Decimal> {
    let min = ctx.config.min_grade;
    let max = ctx.config.max_grade;
    let clamp = |v: Decimal| v.max(min).min(max);

    let total_weight = ctx.total_pending_weight();
    let average = if total_weight > Decimal::ZERO {
        ctx.required_gap / total_weight
    } else {
        Decimal::ZERO
    };

    let mut balanced: Vec<Decimal> = ctx
        .pending
        .iter()
        .zip(raw)
        .map(|(item, &lp)| {
            if item.contributes() {
                let base = match config.blend_source {
                    BlendSource::ProportionalShare => {
                        proportional_share(ctx.required_gap, item.coefficient, total_weight)
                    }
                    BlendSource::LpSolution => lp,
                };
                clamp(round_up(base * config.lp_share + average * config.average_share))
            } else {
                clamp(lp)
            }
        })
        .collect();

    if total_weight > Decimal::ZERO {
        let achieved: Decimal = ctx
            .pending
            .iter()
            .zip(&balanced)
            .map(|(item, v)| item.coefficient * v)
            .sum();
        let deficit = ctx.required_gap - achieved;
        if deficit > Decimal::ZERO {
            let bump = round_up(deficit / total_weight);
            tracing::debug!(%deficit, %bump, "balancer correction pass");
            for (item, value) in ctx.pending.iter().zip(balanced.iter_mut()) {
                if item.contributes() {
                    *value = clamp(*value + bump);
                }
            }
        }
    }

    balanced
}

/// Grade that makes an item carry `w / Σw` of the gap.
fn proportional_share(gap: Decimal, weight: Decimal, total_weight: Decimal) -> Decimal {
    let contribution = gap * (weight / total_weight);
    contribution / weight
}

fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(BALANCE_DP, RoundingStrategy::AwayFromZero)
}
