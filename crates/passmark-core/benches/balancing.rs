use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

use passmark_core::balance::{balance, BalancerConfig};
use passmark_core::constraints::{build, Domain, GradeContext, Method};
use passmark_core::contribution::Normalization;
use passmark_core::model::{Assessment, AssessmentKind, Category, GradeScale, SubjectConfig};

/// A subject with `n` assessments spread over four categories, half graded.
fn subject(n: usize) -> (Vec<Assessment>, Vec<Category>, SubjectConfig) {
    let config = SubjectConfig::from_scale("bench", GradeScale::Chilean);
    let categories: Vec<Category> = (0..4)
        .map(|i| Category {
            id: format!("cat-{i}"),
            subject_id: "bench".into(),
            name: format!("Category {i}"),
            weight: Decimal::from(25),
        })
        .collect();
    let per_category = (n / 4).max(1);
    let assessments = (0..n)
        .map(|i| Assessment {
            id: format!("a-{i}"),
            subject_id: "bench".into(),
            category_id: Some(format!("cat-{}", i % 4)),
            value: (i % 2 == 0).then(|| Decimal::from(3 + (i % 4) as i64)),
            max_value: Decimal::from(7),
            weight: Decimal::ONE_HUNDRED / Decimal::from(per_category as i64),
            kind: AssessmentKind::Exam,
            description: None,
        })
        .collect();
    (assessments, categories, config)
}

fn bench_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade_context");

    for n in [8, 64, 512] {
        let (assessments, categories, config) = subject(n);
        group.bench_function(format!("{n}_assessments"), |b| {
            b.iter(|| {
                GradeContext::new(
                    black_box(&assessments),
                    black_box(&categories),
                    &config,
                    Normalization::ScaleByMaxValue,
                    false,
                )
            })
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_model");

    let (assessments, categories, config) = subject(64);
    let ctx = GradeContext::new(
        &assessments,
        &categories,
        &config,
        Normalization::ScaleByMaxValue,
        false,
    );

    for method in Method::ALL {
        group.bench_function(method.to_string(), |b| {
            b.iter(|| build(black_box(&ctx), method, Domain::Bounded))
        });
    }

    group.finish();
}

fn bench_balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance");

    for n in [8, 64, 512] {
        let (assessments, categories, config) = subject(n);
        let ctx = GradeContext::new(
            &assessments,
            &categories,
            &config,
            Normalization::ScaleByMaxValue,
            false,
        );
        // vertex-like solution: alternate between max and min
        let raw: Vec<Decimal> = (0..ctx.pending.len())
            .map(|i| if i % 2 == 0 { config.max_grade } else { config.min_grade })
            .collect();
        let balancer = BalancerConfig::default();

        group.bench_function(format!("{n}_assessments"), |b| {
            b.iter(|| balance(black_box(&ctx), black_box(&raw), &balancer))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_context, bench_build, bench_balance);
criterion_main!(benches);
