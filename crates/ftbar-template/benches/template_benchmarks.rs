//! Compile and evaluate throughput for toolbar templates.
//!
//! Every item re-evaluates its content and tooltip on each focus change,
//! so a full toolbar pass is a few dozen evaluations of already-compiled
//! templates. Compilation happens once per item.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ftbar_core::config::EvaluatorConfig;
use ftbar_template::{Function, Scope, Template, Value};

const TEMPLATES: [&str; 4] = [
    "window.name == 'None' ? '' : window.title",
    "icon.RiSettings4Fill",
    "t('settings.title') + ' ' + round(battery * 100, 1) + '%'",
    "concat(window.name, ' - ', window.title, ' (', env.USER, ')')",
];

fn seeded_scope() -> Scope {
    let mut scope = Scope::new();
    scope.set(
        "window",
        Value::object([
            ("name", Value::from("code")),
            ("title", Value::from("template_benchmarks.rs - ftbar")),
        ]),
    );
    scope.set(
        "icon",
        Value::object([("RiSettings4Fill", Value::from("RiSettings4Fill"))]),
    );
    scope.set("env", Value::object([("USER", Value::from("dev"))]));
    scope.set("battery", 0.8734);
    scope.set(
        "t",
        Function::new("t", |args| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        }),
    );
    scope
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_compile");
    group.measurement_time(Duration::from_secs(5));

    for (i, src) in TEMPLATES.iter().enumerate() {
        group.bench_function(format!("template_{}", i), |b| {
            b.iter(|| Template::compile(black_box(src)))
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let scope = seeded_scope();
    let limits = EvaluatorConfig::default();
    let compiled: Vec<Template> = TEMPLATES
        .iter()
        .map(|src| Template::compile(src).expect("benchmark template compiles"))
        .collect();

    let mut group = c.benchmark_group("template_evaluate");
    group.measurement_time(Duration::from_secs(5));

    // One render pass of a toolbar with every sample template.
    group.bench_function("render_pass", |b| {
        b.iter(|| {
            for template in &compiled {
                black_box(template.evaluate(&scope, &limits).ok());
            }
        })
    });

    // Worst case: a template that burns its whole step budget.
    let runaway = Template::compile(&vec!["1"; 2_000].join(" + ")).expect("compiles");
    let tight = EvaluatorConfig {
        max_steps: 1_000,
        max_depth: 4_096,
    };
    group.bench_function("step_limit_trip", |b| {
        b.iter(|| black_box(runaway.evaluate(&scope, &tight).is_err()))
    });
    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
