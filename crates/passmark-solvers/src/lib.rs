//! passmark-solvers — LP backends and configuration.
//!
//! Implements the `LpSolver` trait over `good_lp`'s pure-Rust microlp
//! backend, provides a scriptable mock for tests, and builds a ready
//! calculator from a `passmark.toml` file.

pub mod config;
pub mod microlp;
pub mod mock;

pub use config::{build_calculator, create_solver, load_config, PassmarkConfig, SolverConfig};
pub use microlp::MicroLpSolver;
pub use mock::MockSolver;
