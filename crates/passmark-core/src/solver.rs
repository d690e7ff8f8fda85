//! Solver adapter: ready lifecycle and bounded solves around an [`LpSolver`].
//!
//! The adapter is constructed explicitly and handed to the calculator. The
//! backend's `initialize` runs at most once; concurrent first callers await
//! the same in-flight initialization. After that, solves run concurrently on
//! the blocking pool, each against its own model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use crate::error::SolverError;
use crate::lp::{LpModel, LpSolution};
use crate::traits::LpSolver;

/// Default wall-clock limit for a single solve.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60);

pub struct SolverAdapter {
    backend: Arc<dyn LpSolver>,
    ready: OnceCell<()>,
    time_limit: Duration,
}

impl SolverAdapter {
    pub fn new(backend: Arc<dyn LpSolver>) -> Self {
        Self {
            backend,
            ready: OnceCell::new(),
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Bring the backend up. A failed attempt leaves the adapter uninitialized,
    /// so a later call retries.
    pub async fn init(&self) -> Result<(), SolverError> {
        self.ready
            .get_or_try_init(|| async {
                tracing::debug!(backend = self.backend.name(), "initializing LP backend");
                self.backend.initialize().await
            })
            .await
            .map(|_| ())
    }

    /// Solve a model, initializing the backend first if needed.
    pub async fn solve(&self, model: LpModel) -> Result<LpSolution, SolverError> {
        self.init().await?;

        let backend = Arc::clone(&self.backend);
        let started = Instant::now();
        let handle = tokio::task::spawn_blocking(move || backend.solve(&model));

        let solution = match tokio::time::timeout(self.time_limit, handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => return Err(SolverError::Backend(join_error.to_string())),
            Err(_) => {
                tracing::warn!(
                    limit_ms = self.time_limit.as_millis() as u64,
                    "LP solve exceeded its time limit"
                );
                return Err(SolverError::Timeout(self.time_limit.as_millis() as u64));
            }
        };

        tracing::debug!(
            status = ?solution.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LP solve finished"
        );
        Ok(solution)
    }
}
