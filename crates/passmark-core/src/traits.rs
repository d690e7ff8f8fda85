//! Core trait definitions for LP backends and gradebook collaborators.
//!
//! `LpSolver` is implemented by the `passmark-solvers` crate; `GradebookSource`
//! is implemented by whatever owns the stored assessments (an in-memory
//! [`Gradebook`](crate::gradebook::Gradebook) ships with this crate).

use async_trait::async_trait;

use crate::error::SolverError;
use crate::lp::{LpModel, LpSolution};
use crate::model::{Assessment, Category, SubjectConfig};

// ---------------------------------------------------------------------------
// LP solver trait
// ---------------------------------------------------------------------------

/// Trait for linear-program backends.
#[async_trait]
pub trait LpSolver: Send + Sync {
    /// Human-readable backend name (e.g. "microlp").
    fn name(&self) -> &str;

    /// One-time backend setup. Called at most once by [`SolverAdapter`].
    ///
    /// [`SolverAdapter`]: crate::solver::SolverAdapter
    async fn initialize(&self) -> Result<(), SolverError> {
        Ok(())
    }

    /// Solve a minimisation model. CPU-bound; the adapter runs it on the
    /// blocking pool.
    fn solve(&self, model: &LpModel) -> Result<LpSolution, SolverError>;
}

// ---------------------------------------------------------------------------
// Gradebook source trait
// ---------------------------------------------------------------------------

/// Read-only access to the stored inputs of a subject.
pub trait GradebookSource: Send + Sync {
    /// Every assessment recorded for the subject, graded or pending.
    fn assessments(&self, subject_id: &str) -> Vec<Assessment>;

    /// Categories defined for the subject.
    fn categories(&self, subject_id: &str) -> Vec<Category>;

    /// The subject's grading scale, if one has been configured.
    fn config(&self, subject_id: &str) -> Option<SubjectConfig>;
}
