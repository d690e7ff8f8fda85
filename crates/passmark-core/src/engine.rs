//! Grade calculator orchestrator.
//!
//! Loads a subject's inputs, computes the current grade, formulates and
//! solves the LP for the requested method, balances the result, and
//! classifies it. Data and solver problems are reported inside the result;
//! only an unknown method is an `Err`.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use crate::balance::{balance, BalancerConfig};
use crate::constraints::{self, Domain, Formulation, GradeContext, Method};
use crate::contribution::Normalization;
use crate::error::CalculationError;
use crate::extract;
use crate::model::{Assessment, Category, SubjectConfig};
use crate::recommend::recommendations;
use crate::results::{Diagnostic, GradeCalculationResult, GradeProjection, SubjectStatus};
use crate::solver::SolverAdapter;
use crate::traits::GradebookSource;

/// Configuration for the grade calculator.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Maximum subjects evaluated concurrently by `calculate_many`.
    pub parallelism: usize,
    /// How recorded values map onto the subject scale.
    pub normalization: Normalization,
    /// Run the fallback with free variable domains.
    pub fallback_unbounded: bool,
    /// Plan a synthetic assessment for weighted categories with none recorded.
    pub fill_empty_categories: bool,
    pub balancer: BalancerConfig,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            normalization: Normalization::default(),
            fallback_unbounded: true,
            fill_empty_categories: false,
            balancer: BalancerConfig::default(),
        }
    }
}

/// Outcome of running one objective variant.
enum Plan {
    /// Raw and balanced values per pending item.
    Values {
        raw: Vec<Decimal>,
        balanced: Vec<Decimal>,
    },
    /// The LP has no optimum within the chosen domain.
    Infeasible,
    /// A positive gap but nothing pending can move the grade.
    NoContributingItems,
    /// The solver could not produce an answer.
    Failed(Diagnostic),
}

/// Computes required grades for subjects.
pub struct GradeCalculator {
    solver: Arc<SolverAdapter>,
    config: CalculatorConfig,
}

impl GradeCalculator {
    pub fn new(solver: Arc<SolverAdapter>, config: CalculatorConfig) -> Self {
        Self { solver, config }
    }

    pub fn solver(&self) -> &SolverAdapter {
        &self.solver
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Calculate required grades for one subject.
    ///
    /// The method name is checked before anything else is loaded.
    pub async fn calculate(
        &self,
        source: &dyn GradebookSource,
        subject_id: &str,
        method: &str,
    ) -> Result<GradeCalculationResult, CalculationError> {
        let method: Method = method.parse()?;
        Ok(self.calculate_method(source, subject_id, method).await)
    }

    pub async fn calculate_method(
        &self,
        source: &dyn GradebookSource,
        subject_id: &str,
        method: Method,
    ) -> GradeCalculationResult {
        let assessments = source.assessments(subject_id);
        let categories = source.categories(subject_id);
        let config = source.config(subject_id);
        self.calculate_inputs(subject_id, &assessments, &categories, config.as_ref(), method)
            .await
    }

    /// Calculate several subjects concurrently, bounded by `parallelism`.
    /// Results come back in input order.
    pub async fn calculate_many(
        &self,
        source: &dyn GradebookSource,
        subject_ids: &[String],
        method: &str,
    ) -> Result<Vec<GradeCalculationResult>, CalculationError> {
        let method: Method = method.parse()?;
        let semaphore = Semaphore::new(self.config.parallelism.max(1));

        let mut futures = FuturesUnordered::new();
        for (index, subject_id) in subject_ids.iter().enumerate() {
            let semaphore = &semaphore;
            futures.push(async move {
                let _permit = semaphore.acquire().await.ok();
                let result = self.calculate_method(source, subject_id, method).await;
                (index, result)
            });
        }

        let mut results = Vec::with_capacity(subject_ids.len());
        while let Some(entry) = futures.next().await {
            results.push(entry);
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    /// Calculate from explicit inputs.
    #[tracing::instrument(
        skip(self, assessments, categories, config, method),
        fields(assessment_count = assessments.len(), method = %method)
    )]
    pub async fn calculate_inputs(
        &self,
        subject_id: &str,
        assessments: &[Assessment],
        categories: &[Category],
        config: Option<&SubjectConfig>,
        method: Method,
    ) -> GradeCalculationResult {
        let Some(config) = config else {
            tracing::warn!("subject has no grading configuration");
            return GradeCalculationResult::guidance(
                subject_id,
                method,
                Diagnostic::MissingConfiguration,
                "Configure a grading scale for this subject to calculate required grades.",
            );
        };
        if let Err(message) = config.validate() {
            tracing::warn!(%message, "invalid grading configuration");
            return GradeCalculationResult::guidance(
                subject_id,
                method,
                Diagnostic::InvalidConfiguration(message),
                "Fix the grading scale: the minimum must be below the maximum and the passing grade within them.",
            );
        }
        if assessments.is_empty() {
            return GradeCalculationResult::guidance(
                subject_id,
                method,
                Diagnostic::NoAssessments,
                "Add assessments to this subject to calculate required grades.",
            );
        }

        let ctx = GradeContext::new(
            assessments,
            categories,
            config,
            self.config.normalization,
            self.config.fill_empty_categories,
        );
        let already_passed = ctx.current_grade >= config.passing_grade;

        let mut diagnostic = None;
        let mut fallback_applied = false;
        let (mut raw, mut balanced) = match self.run(&ctx, method, Domain::Bounded).await {
            Plan::Values { raw, balanced } => (raw, balanced),
            Plan::Infeasible => (Vec::new(), Vec::new()),
            Plan::NoContributingItems => (floor(&ctx), floor(&ctx)),
            Plan::Failed(d) => {
                diagnostic = Some(d);
                (Vec::new(), Vec::new())
            }
        };

        let mut projected = ctx.projected(&balanced);
        if projected < config.passing_grade && diagnostic.is_none() && !ctx.pending.is_empty() {
            let domain = if self.config.fallback_unbounded {
                Domain::Unbounded
            } else {
                Domain::Bounded
            };
            tracing::debug!(?domain, "passing not reached, running fallback");
            match self.run(&ctx, Method::MinDistanceToMax, domain).await {
                Plan::Values {
                    raw: fallback_raw,
                    balanced: fallback_balanced,
                } => {
                    let capped = fallback_raw
                        .iter()
                        .any(|v| !extract::is_achievable(*v, config));
                    if capped {
                        diagnostic = Some(Diagnostic::CappedByMaxGrade);
                    }
                    raw = fallback_raw;
                    balanced = fallback_balanced;
                    fallback_applied = true;
                }
                Plan::Infeasible => diagnostic = Some(Diagnostic::CappedByMaxGrade),
                Plan::NoContributingItems => {
                    diagnostic = Some(Diagnostic::UnreachableRegardlessOfBounds);
                    raw = floor(&ctx);
                    balanced = floor(&ctx);
                }
                Plan::Failed(d) => diagnostic = Some(d),
            }
            projected = ctx.projected(&balanced);
        }

        let can_pass = projected >= config.passing_grade;
        let status = if already_passed {
            SubjectStatus::Pass
        } else if can_pass {
            SubjectStatus::InProgress
        } else {
            SubjectStatus::Fail
        };

        let required_grades = extract::required_grades(&ctx, &raw, &balanced);
        let recommendations =
            recommendations(&required_grades, already_passed, can_pass, diagnostic.as_ref());

        let maximum_attainable = ctx.maximum_attainable();

        tracing::debug!(
            current = %ctx.current_grade,
            %projected,
            can_pass,
            %status,
            fallback_applied,
            "grade calculation finished"
        );

        GradeCalculationResult {
            subject_id: subject_id.to_string(),
            current_grade: ctx.current_grade,
            can_pass,
            status,
            required_grades,
            recommendations,
            calculated_at: chrono::Utc::now(),
            method,
            fallback_applied,
            projection: Some(GradeProjection {
                projected,
                maximum_attainable,
                target: config.passing_grade,
            }),
            diagnostic,
        }
    }

    async fn run(&self, ctx: &GradeContext, method: Method, domain: Domain) -> Plan {
        let model = match constraints::build(ctx, method, domain) {
            Formulation::NothingPending => {
                return Plan::Values {
                    raw: Vec::new(),
                    balanced: Vec::new(),
                }
            }
            Formulation::AlreadySecured => {
                return Plan::Values {
                    raw: floor(ctx),
                    balanced: floor(ctx),
                };
            }
            Formulation::Unreachable => return Plan::NoContributingItems,
            Formulation::Model(model) => model,
        };

        match self.solver.solve(model).await {
            Ok(solution) => match extract::solved_values(ctx, &solution) {
                Some(raw) => {
                    let balanced = balance(ctx, &raw, &self.config.balancer);
                    Plan::Values { raw, balanced }
                }
                None => {
                    tracing::debug!(status = ?solution.status, %method, "no optimal solution");
                    Plan::Infeasible
                }
            },
            Err(e) if e.is_initialization() => {
                tracing::warn!(error = %e, "LP backend unavailable");
                Plan::Failed(Diagnostic::SolverUnavailable(e.to_string()))
            }
            Err(e) => {
                tracing::warn!(error = %e, %method, "LP solve failed");
                Plan::Failed(Diagnostic::SolverFailure(e.to_string()))
            }
        }
    }
}

/// Minimum grade for every pending item.
fn floor(ctx: &GradeContext) -> Vec<Decimal> {
    vec![ctx.config.min_grade; ctx.pending.len()]
}
