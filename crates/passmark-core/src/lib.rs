//! passmark-core — Grade model, LP formulation, and pass/fail orchestration.
//!
//! This crate defines the data model, the weighted-contribution arithmetic,
//! the linear-program formulations, and the calculator that ties them to a
//! pluggable LP backend.

pub mod balance;
pub mod constraints;
pub mod contribution;
pub mod engine;
pub mod error;
pub mod extract;
pub mod gradebook;
pub mod lp;
pub mod model;
pub mod recommend;
pub mod results;
pub mod solver;
pub mod traits;

pub use constraints::Method;
pub use engine::{CalculatorConfig, GradeCalculator};
pub use error::{CalculationError, SolverError};
pub use gradebook::Gradebook;
pub use model::{Assessment, AssessmentKind, Category, GradeScale, SubjectConfig};
pub use results::{Diagnostic, GradeCalculationResult, RequiredGrade, SubjectStatus};
pub use solver::SolverAdapter;
pub use traits::{GradebookSource, LpSolver};
