//! Backend-neutral linear program representation.
//!
//! The constraint builder produces an [`LpModel`]; any [`LpSolver`] turns it
//! into an [`LpSolution`]. Coefficients are `f64` because that is what every
//! LP backend consumes; the decimal domain ends at this boundary.
//!
//! [`LpSolver`]: crate::traits::LpSolver

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index of a variable inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// A decision variable with optional bounds (`None` = unbounded side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpVariable {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

/// `Σ coef·var (relation) rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// A minimisation problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LpModel {
    pub name: String,
    pub variables: Vec<LpVariable>,
    pub constraints: Vec<LpConstraint>,
    /// Objective terms, minimised.
    pub objective: Vec<(VarId, f64)>,
}

impl LpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> VarId {
        self.variables.push(LpVariable {
            name: name.into(),
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(LpConstraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        });
    }

    pub fn minimise(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    pub fn variable(&self, id: VarId) -> &LpVariable {
        &self.variables[id.0]
    }

    /// Evaluate the objective at the given assignment (missing names count as 0).
    pub fn objective_value(&self, values: &BTreeMap<String, f64>) -> f64 {
        self.objective
            .iter()
            .map(|(id, coef)| coef * values.get(&self.variable(*id).name).copied().unwrap_or(0.0))
            .sum()
    }

    /// Check bounds and constraints against an assignment, within `tolerance`.
    pub fn is_satisfied_by(&self, values: &BTreeMap<String, f64>, tolerance: f64) -> bool {
        let value_of = |id: VarId| {
            values
                .get(&self.variable(id).name)
                .copied()
                .unwrap_or(0.0)
        };

        let bounds_ok = self.variables.iter().enumerate().all(|(i, var)| {
            let v = value_of(VarId(i));
            var.lower.map_or(true, |lb| v >= lb - tolerance)
                && var.upper.map_or(true, |ub| v <= ub + tolerance)
        });

        bounds_ok
            && self.constraints.iter().all(|c| {
                let lhs: f64 = c.terms.iter().map(|(id, coef)| coef * value_of(*id)).sum();
                match c.relation {
                    Relation::GreaterOrEqual => lhs >= c.rhs - tolerance,
                    Relation::LessOrEqual => lhs <= c.rhs + tolerance,
                    Relation::Equal => (lhs - c.rhs).abs() <= tolerance,
                }
            })
    }
}

/// Outcome class reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Other(String),
}

/// Status plus variable assignment keyed by variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpSolution {
    pub status: SolveStatus,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl LpSolution {
    pub fn optimal(values: BTreeMap<String, f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
        }
    }

    pub fn with_status(status: SolveStatus) -> Self {
        Self {
            status,
            values: BTreeMap::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}
