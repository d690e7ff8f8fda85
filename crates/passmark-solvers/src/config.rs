//! Calculator configuration and solver factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use passmark_core::balance::BalancerConfig;
use passmark_core::constraints::Method;
use passmark_core::contribution::Normalization;
use passmark_core::solver::SolverAdapter;
use passmark_core::traits::LpSolver;
use passmark_core::{CalculatorConfig, GradeCalculator};

use crate::microlp::MicroLpSolver;
use crate::mock::MockSolver;

/// Which LP backend to use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SolverConfig {
    #[default]
    Microlp,
    Mock {
        /// Fail initialization with this message.
        #[serde(default)]
        init_error: Option<String>,
    },
}

/// Top-level passmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassmarkConfig {
    /// Objective used when the caller does not pick one.
    #[serde(default = "default_method")]
    pub method: String,
    /// Wall-clock limit for a single LP solve.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u64,
    /// Max subjects calculated concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub normalization: Normalization,
    /// Run the fallback objective with free variable domains.
    #[serde(default = "default_true")]
    pub fallback_unbounded: bool,
    #[serde(default)]
    pub fill_empty_categories: bool,
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

fn default_method() -> String {
    Method::MinDistanceToPassingGap.to_string()
}
fn default_time_limit() -> u64 {
    60
}
fn default_parallelism() -> usize {
    4
}
fn default_true() -> bool {
    true
}

impl Default for PassmarkConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            time_limit_secs: default_time_limit(),
            parallelism: default_parallelism(),
            normalization: Normalization::default(),
            fallback_unbounded: true,
            fill_empty_categories: false,
            balancer: BalancerConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl PassmarkConfig {
    /// The configured default method.
    pub fn method(&self) -> Result<Method> {
        self.method
            .parse::<Method>()
            .with_context(|| format!("invalid method in config: {}", self.method))
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn calculator_config(&self) -> CalculatorConfig {
        CalculatorConfig {
            parallelism: self.parallelism,
            normalization: self.normalization,
            fallback_unbounded: self.fallback_unbounded,
            fill_empty_categories: self.fill_empty_categories,
            balancer: self.balancer.clone(),
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `passmark.toml` in the current directory
/// 2. `~/.config/passmark/config.toml`
///
/// Environment variable overrides: `PASSMARK_METHOD`, `PASSMARK_TIME_LIMIT_SECS`,
/// `PASSMARK_PARALLELISM`.
pub fn load_config() -> Result<PassmarkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PassmarkConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("passmark.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PassmarkConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PassmarkConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.method()?;

    Ok(config)
}

/// Apply `PASSMARK_*` overrides looked up through `var`.
fn apply_overrides(
    config: &mut PassmarkConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(method) = var("PASSMARK_METHOD") {
        config.method = method;
    }
    if let Some(secs) = var("PASSMARK_TIME_LIMIT_SECS") {
        config.time_limit_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("invalid PASSMARK_TIME_LIMIT_SECS: {secs}"))?;
    }
    if let Some(parallelism) = var("PASSMARK_PARALLELISM") {
        config.parallelism = parallelism
            .trim()
            .parse()
            .with_context(|| format!("invalid PASSMARK_PARALLELISM: {parallelism}"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("passmark"))
}

/// Create a solver backend from its configuration.
pub fn create_solver(config: &SolverConfig) -> Arc<dyn LpSolver> {
    match config {
        SolverConfig::Microlp => Arc::new(MicroLpSolver::new()),
        SolverConfig::Mock { init_error } => {
            let mock = MockSolver::new();
            match init_error {
                Some(message) => Arc::new(mock.failing_init(message.clone())),
                None => Arc::new(mock),
            }
        }
    }
}

/// Build a calculator with its solver adapter from a loaded configuration.
pub fn build_calculator(config: &PassmarkConfig) -> GradeCalculator {
    let backend = create_solver(&config.solver);
    tracing::debug!(backend = backend.name(), "creating grade calculator");
    let adapter = SolverAdapter::new(backend).with_time_limit(config.time_limit());
    GradeCalculator::new(Arc::new(adapter), config.calculator_config())
}
