//! Mock solver for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use passmark_core::error::SolverError;
use passmark_core::lp::{LpModel, LpSolution, SolveStatus};
use passmark_core::traits::LpSolver;

/// A scriptable LP backend for exercising the calculator without a real solver.
///
/// Scripted solutions are returned in order; once they run out every solve
/// returns the fallback solution.
pub struct MockSolver {
    /// Solutions returned by successive solves.
    scripted: Mutex<VecDeque<LpSolution>>,
    /// Returned when the script is exhausted.
    fallback: LpSolution,
    /// Error returned by `initialize`, if any.
    init_error: Option<String>,
    /// Error returned by every solve, if any.
    solve_error: Option<String>,
    init_delay: Duration,
    solve_delay: Duration,
    init_count: AtomicU32,
    call_count: AtomicU32,
    last_model: Mutex<Option<LpModel>>,
}

impl MockSolver {
    /// A mock that reports every model as infeasible.
    pub fn new() -> Self {
        Self::with_fixed_solution(LpSolution::with_status(SolveStatus::Infeasible))
    }

    /// A mock that always returns the same solution.
    pub fn with_fixed_solution(solution: LpSolution) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: solution,
            init_error: None,
            solve_error: None,
            init_delay: Duration::ZERO,
            solve_delay: Duration::ZERO,
            init_count: AtomicU32::new(0),
            call_count: AtomicU32::new(0),
            last_model: Mutex::new(None),
        }
    }

    /// Queue solutions to return, in order, before the fallback.
    pub fn with_script(mut self, solutions: impl IntoIterator<Item = LpSolution>) -> Self {
        self.scripted = Mutex::new(solutions.into_iter().collect());
        self
    }

    /// Make `initialize` fail with the given message.
    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.init_error = Some(message.into());
        self
    }

    /// Make every solve fail with a backend error.
    pub fn failing_solve(mut self, message: impl Into<String>) -> Self {
        self.solve_error = Some(message.into());
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_solve_delay(mut self, delay: Duration) -> Self {
        self.solve_delay = delay;
        self
    }

    /// Number of times `initialize` ran.
    pub fn init_count(&self) -> u32 {
        self.init_count.load(Ordering::Relaxed)
    }

    /// Number of solves requested.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last model handed to `solve`.
    pub fn last_model(&self) -> Option<LpModel> {
        self.last_model.lock().unwrap().clone()
    }
}

impl Default for MockSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LpSolver for MockSolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<(), SolverError> {
        self.init_count.fetch_add(1, Ordering::Relaxed);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        match &self.init_error {
            Some(message) => Err(SolverError::InitializationFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn solve(&self, model: &LpModel) -> Result<LpSolution, SolverError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_model.lock().unwrap() = Some(model.clone());

        if !self.solve_delay.is_zero() {
            std::thread::sleep(self.solve_delay);
        }
        if let Some(message) = &self.solve_error {
            return Err(SolverError::Backend(message.clone()));
        }

        let next = self.scripted.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn script_then_fallback() {
        let first = LpSolution::optimal(BTreeMap::from([("x".to_string(), 1.0)]));
        let solver = MockSolver::new().with_script([first.clone()]);
        let model = LpModel::new("m");

        assert_eq!(solver.solve(&model).unwrap(), first);
        assert_eq!(solver.solve(&model).unwrap().status, SolveStatus::Infeasible);
        assert_eq!(solver.call_count(), 2);
        assert_eq!(solver.last_model().unwrap().name, "m");
    }

    #[tokio::test]
    async fn failing_init_counts_attempts() {
        let solver = MockSolver::new().failing_init("no license");
        let err = solver.initialize().await.unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(solver.init_count(), 1);
    }

    #[test]
    fn failing_solve_is_backend_error() {
        let solver = MockSolver::new().failing_solve("crashed");
        let err = solver.solve(&LpModel::new("m")).unwrap_err();
        assert!(matches!(err, SolverError::Backend(m) if m == "crashed"));
    }
}
