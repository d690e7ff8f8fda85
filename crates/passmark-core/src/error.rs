//! Error types.
//!
//! `SolverError` is defined here rather than in `passmark-solvers` so the
//! calculator can classify backend failures without string matching.

use thiserror::Error;

/// Errors raised by an LP backend or the adapter driving it.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// The backend could not be brought up.
    #[error("solver initialization failed: {0}")]
    InitializationFailed(String),

    /// The solve did not finish within the configured limit.
    #[error("solver timed out after {0}ms")]
    Timeout(u64),

    /// The backend failed while solving.
    #[error("solver backend error: {0}")]
    Backend(String),
}

impl SolverError {
    /// Returns `true` if the backend never became ready.
    pub fn is_initialization(&self) -> bool {
        matches!(self, SolverError::InitializationFailed(_))
    }
}

/// Errors returned from `GradeCalculator::calculate`.
///
/// Only programmer errors end up here; data and solver outcomes are reported
/// inside the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    /// The requested objective variant does not exist.
    #[error("method {0} is not supported")]
    UnsupportedMethod(String),
}
