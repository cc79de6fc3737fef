//! Expression engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use smctl_core::{Compute, Numeric};

fn create_compute() -> Compute {
    let mut compute = Compute::new("bench");
    compute.set_var("temp", 24.5);
    compute.set_var("humidity", 61);
    compute.set_var("threshold", 30);
    compute
}

fn bench_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_math");
    let mut compute = create_compute();

    let cases = [
        ("scalar", json!(42)),
        ("variable", json!("bench.temp")),
        ("nested", json!({"sum": [{"sqrt": [64]}, {"mul": [2, 17]}]})),
        (
            "conditional",
            json!({"?": [{"gt": ["temp", "threshold"]}, {"mul": ["humidity", 2]}, {"neg": ["humidity"]}]}),
        ),
    ];

    for (name, expr) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            b.iter(|| black_box(compute.eval_math(black_box(expr))))
        });
    }

    group.finish();
}

fn bench_condition(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_condition");
    let mut compute = create_compute();

    let simple = json!({"gt": ["humidity", 30]});
    group.bench_function("simple", |b| {
        b.iter(|| black_box(compute.eval_condition(black_box(&simple))))
    });

    let compound = json!({
        "and": [
            {"gt": ["humidity", "threshold"]},
            {"or": [{"lt": ["temp", 20]}, {"gte": [{"sub": ["temp", 4.5]}, 20]}]},
            {"not": [{"eq": ["humidity", 0]}]}
        ]
    });
    group.bench_function("compound", |b| {
        b.iter(|| black_box(compute.eval_condition(black_box(&compound))))
    });

    group.finish();
}

fn bench_custom_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_custom_function");
    let mut compute = create_compute();
    compute.register_function("scale", |ctx| {
        ctx.param_as_numeric(0, Numeric::Long(0)) * ctx.param_as_numeric(1, Numeric::Long(1))
    });

    let expr = json!({"scale": ["temp", 10]});
    group.bench_function("scale", |b| {
        b.iter(|| black_box(compute.eval_math(black_box(&expr))))
    });

    group.finish();
}

criterion_group!(benches, bench_math, bench_condition, bench_custom_function);

criterion_main!(benches);
