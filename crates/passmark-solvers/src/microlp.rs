//! `good_lp` backend using the pure-Rust microlp solver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};

use passmark_core::error::SolverError;
use passmark_core::lp::{LpModel, LpSolution, Relation, SolveStatus, VarId};
use passmark_core::traits::LpSolver;

/// LP backend over `good_lp` with microlp. Needs no setup and holds no state,
/// so it is safe to share across concurrent solves.
#[derive(Debug, Clone, Default)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LpSolver for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &LpModel) -> Result<LpSolution, SolverError> {
        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .variables
            .iter()
            .map(|v| {
                let mut definition = variable().name(v.name.clone());
                if let Some(lower) = v.lower {
                    definition = definition.min(lower);
                }
                if let Some(upper) = v.upper {
                    definition = definition.max(upper);
                }
                problem.add(definition)
            })
            .collect();

        let linear = |terms: &[(VarId, f64)]| -> Result<Expression, SolverError> {
            let mut expr = Expression::from(0);
            for (id, coef) in terms {
                let var = vars.get(id.0).ok_or_else(|| {
                    SolverError::Backend(format!(
                        "model {} references unknown variable {}",
                        model.name, id.0
                    ))
                })?;
                expr += *coef * *var;
            }
            Ok(expr)
        };

        let objective = linear(&model.objective)?;
        let mut solver = problem.minimise(objective).using(default_solver);
        for c in &model.constraints {
            let lhs = linear(&c.terms)?;
            let built = match c.relation {
                Relation::GreaterOrEqual => constraint::geq(lhs, c.rhs),
                Relation::LessOrEqual => constraint::leq(lhs, c.rhs),
                Relation::Equal => constraint::eq(lhs, c.rhs),
            };
            solver.add_constraint(built);
        }

        match solver.solve() {
            Ok(solution) => {
                let values: BTreeMap<String, f64> = model
                    .variables
                    .iter()
                    .zip(&vars)
                    .map(|(v, var)| (v.name.clone(), solution.value(*var)))
                    .collect();
                Ok(LpSolution::optimal(values))
            }
            Err(ResolutionError::Infeasible) => {
                Ok(LpSolution::with_status(SolveStatus::Infeasible))
            }
            Err(ResolutionError::Unbounded) => Ok(LpSolution::with_status(SolveStatus::Unbounded)),
            Err(other) => {
                tracing::debug!(
                    model = %model.name,
                    error = %other,
                    "microlp returned no solution"
                );
                Ok(LpSolution::with_status(SolveStatus::Other(other.to_string())))
            }
        }
    }
}
