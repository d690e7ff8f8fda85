//! Solver lifecycle under the calculator: one-time init, init failure,
//! timeouts, and concurrent subjects.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use passmark_core::gradebook::Gradebook;
use passmark_core::lp::LpSolution;
use passmark_core::results::Diagnostic;
use passmark_core::solver::SolverAdapter;
use passmark_core::{
    Assessment, AssessmentKind, CalculationError, CalculatorConfig, GradeCalculator, GradeScale,
    SubjectConfig, SubjectStatus,
};
use passmark_solvers::{build_calculator, MockSolver, PassmarkConfig, SolverConfig};

fn pending_subject(book: &mut Gradebook, subject_id: &str, known: Decimal) {
    book.set_config(SubjectConfig::from_scale(subject_id, GradeScale::Chilean));
    book.upsert_assessment(Assessment {
        id: "known".into(),
        subject_id: subject_id.into(),
        category_id: None,
        value: Some(known),
        max_value: dec!(7),
        weight: dec!(60),
        kind: AssessmentKind::Exam,
        description: None,
    });
    book.upsert_assessment(Assessment {
        id: "final".into(),
        subject_id: subject_id.into(),
        category_id: None,
        value: None,
        max_value: dec!(7),
        weight: dec!(40),
        kind: AssessmentKind::Exam,
        description: Some("Final".into()),
    });
}

fn calculator_over(mock: Arc<MockSolver>, time_limit: Duration) -> GradeCalculator {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let adapter = SolverAdapter::new(mock).with_time_limit(time_limit);
    GradeCalculator::new(Arc::new(adapter), CalculatorConfig::default())
}

fn solved(value: f64) -> LpSolution {
    LpSolution::optimal(BTreeMap::from([("grade_0".to_string(), value)]))
}

#[tokio::test]
async fn concurrent_subjects_share_one_init() {
    let mock = Arc::new(
        MockSolver::with_fixed_solution(solved(2.5)).with_init_delay(Duration::from_millis(30)),
    );
    let calculator = calculator_over(mock.clone(), Duration::from_secs(5));

    let mut book = Gradebook::new();
    let ids: Vec<String> = (0..8).map(|i| format!("subject-{i}")).collect();
    for id in &ids {
        pending_subject(&mut book, id, dec!(5));
    }

    let results = calculator.calculate_many(&book, &ids, "min_sum").await.unwrap();

    assert_eq!(mock.init_count(), 1);
    assert_eq!(mock.call_count(), 8);
    assert!(calculator.solver().is_ready());
    let returned: Vec<&str> = results.iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(returned, ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(results.iter().all(|r| r.can_pass));
}

#[tokio::test]
async fn calculate_many_rejects_unknown_method() {
    let mock = Arc::new(MockSolver::new());
    let calculator = calculator_over(mock.clone(), Duration::from_secs(5));
    let book = Gradebook::new();

    let err = calculator
        .calculate_many(&book, &["a".to_string()], "fastest")
        .await
        .unwrap_err();
    assert_eq!(err, CalculationError::UnsupportedMethod("fastest".into()));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn init_failure_is_reported_and_retried() {
    let mock = Arc::new(MockSolver::new().failing_init("backend missing"));
    let calculator = calculator_over(mock.clone(), Duration::from_secs(5));
    let mut book = Gradebook::new();
    pending_subject(&mut book, "s", dec!(5));

    let result = calculator.calculate(&book, "s", "min_sum").await.unwrap();
    assert!(matches!(
        result.diagnostic,
        Some(Diagnostic::SolverUnavailable(ref m)) if m.contains("backend missing")
    ));
    assert!(!result.can_pass);
    assert_eq!(result.status, SubjectStatus::Fail);
    assert!(result.recommendations[0].contains("backend missing"));
    assert!(!result.fallback_applied);
    assert!(result.required_grades.is_empty());
    assert_eq!(mock.call_count(), 0);

    calculator.calculate(&book, "s", "min_sum").await.unwrap();
    assert_eq!(mock.init_count(), 2);
}

#[tokio::test]
async fn slow_solve_is_a_solver_failure() {
    let mock = Arc::new(
        MockSolver::with_fixed_solution(solved(2.5)).with_solve_delay(Duration::from_millis(300)),
    );
    let calculator = calculator_over(mock.clone(), Duration::from_millis(20));
    let mut book = Gradebook::new();
    pending_subject(&mut book, "s", dec!(5));

    let result = calculator.calculate(&book, "s", "min_sum").await.unwrap();
    assert!(matches!(result.diagnostic, Some(Diagnostic::SolverFailure(_))));
    assert_eq!(result.status, SubjectStatus::Fail);
    assert!(!result.can_pass);
    // no fallback after a failure
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn backend_error_is_a_solver_failure() {
    let mock = Arc::new(MockSolver::new().failing_solve("segfault"));
    let calculator = calculator_over(mock.clone(), Duration::from_secs(5));
    let mut book = Gradebook::new();
    pending_subject(&mut book, "s", dec!(5));

    let result = calculator.calculate(&book, "s", "min_sum").await.unwrap();
    assert!(matches!(
        result.diagnostic,
        Some(Diagnostic::SolverFailure(ref m)) if m.contains("segfault")
    ));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn infeasible_primary_runs_fallback_model() {
    // current 0.6, gap 3.4 over 0.4: primary infeasible, fallback needs 8.5
    let mock = Arc::new(MockSolver::new().with_script([
        LpSolution::with_status(passmark_core::lp::SolveStatus::Infeasible),
        solved(8.5),
    ]));
    let calculator = calculator_over(mock.clone(), Duration::from_secs(5));
    let mut book = Gradebook::new();
    pending_subject(&mut book, "s", dec!(1));

    let result = calculator.calculate(&book, "s", "min_sum").await.unwrap();
    assert_eq!(mock.call_count(), 2);
    assert!(result.fallback_applied);
    assert_eq!(result.diagnostic, Some(Diagnostic::CappedByMaxGrade));
    assert_eq!(result.required_grades[0].required_value, dec!(7));
    assert!(!result.required_grades[0].achievable);
    assert!(!result.can_pass);
    assert_eq!(result.status, SubjectStatus::Fail);

    let fallback_model = mock.last_model().unwrap();
    assert!(fallback_model.name.ends_with("min_distance_to_max"));
    assert!(fallback_model.variables[0].upper.is_none());
}

#[tokio::test]
async fn calculator_from_config_uses_mock_backend() {
    let config: PassmarkConfig = toml::from_str(
        r#"
time_limit_secs = 1

[solver]
type = "mock"
init_error = "disabled in config"
"#,
    )
    .unwrap();
    assert!(matches!(config.solver, SolverConfig::Mock { .. }));

    let calculator = build_calculator(&config);
    assert_eq!(calculator.solver().backend_name(), "mock");

    let mut book = Gradebook::new();
    pending_subject(&mut book, "s", dec!(5));
    let result = calculator
        .calculate(&book, "s", &config.method)
        .await
        .unwrap();
    assert!(matches!(
        result.diagnostic,
        Some(Diagnostic::SolverUnavailable(_))
    ));
}
