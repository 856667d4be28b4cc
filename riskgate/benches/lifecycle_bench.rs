//! Benchmarks for training and inference of the built-in plugins.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use datafusion::prelude::*;
use riskgate::core::{Dataset, ExecutionContext};
use riskgate::plugins::ModelRegistry;
use riskgate::runner::ModelRunner;
use riskgate::sources::{SourceDescriptor, TableSource};
use serde_json::json;
use std::hint::black_box;
use tokio::runtime::Runtime;

/// Login activity with one outlier every 97 rows.
fn login_rows(rows: usize) -> Dataset {
    let values: Vec<_> = (0..rows)
        .map(|i| {
            let scale = if i % 97 == 0 { 40.0 } else { 1.0 };
            json!({
                "user_id": format!("user_{i}"),
                "logins": (5 + i % 7) as f64 * scale,
                "failures": (i % 3) as f64 * scale,
                "bytes": 1_000.0 + (i % 13) as f64 * 10.0,
            })
        })
        .collect();
    Dataset::from_json_rows(&values).unwrap()
}

fn edge_rows(nodes: usize) -> Dataset {
    let values: Vec<_> = (0..nodes * 3)
        .map(|i| json!({"source": format!("n{}", i % nodes), "target": format!("n{}", (i * 7 + 1) % nodes)}))
        .collect();
    Dataset::from_json_rows(&values).unwrap()
}

fn benchmark_row_plugins(c: &mut Criterion) {
    let registry = ModelRegistry::builtin();
    let mut group = c.benchmark_group("row_plugins");
    group.sample_size(20);

    for rows in [500, 5_000] {
        let ctx = ExecutionContext::lightweight(login_rows(rows));
        for slug in ["isolation-forest", "dense-autoencoder"] {
            group.bench_with_input(BenchmarkId::new(format!("{slug}/train"), rows), &ctx, |b, ctx| {
                b.iter(|| {
                    let mut plugin = registry.create(slug).unwrap();
                    black_box(plugin.train(ctx).unwrap())
                })
            });

            let mut trained = registry.create(slug).unwrap();
            trained.train(&ctx).unwrap();
            group.bench_with_input(BenchmarkId::new(format!("{slug}/infer"), rows), &ctx, |b, ctx| {
                b.iter(|| black_box(trained.infer(ctx).unwrap()))
            });
        }
    }
    group.finish();
}

fn benchmark_centrality(c: &mut Criterion) {
    let registry = ModelRegistry::builtin();
    let mut group = c.benchmark_group("centrality");

    for nodes in [100, 1_000] {
        let ctx = ExecutionContext::lightweight(edge_rows(nodes));
        group.bench_with_input(BenchmarkId::new("pagerank", nodes), &ctx, |b, ctx| {
            b.iter(|| {
                let mut plugin = registry.create("pagerank-centrality").unwrap();
                plugin.train(ctx).unwrap();
                black_box(plugin.infer(ctx).unwrap())
            })
        });
    }
    group.finish();
}

fn benchmark_table_load(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let runner = rt.block_on(async {
        let ctx = SessionContext::new();
        let batch = login_rows(10_000).batch().clone();
        let df = ctx.read_batch(batch).unwrap();
        ctx.register_table("logins", df.into_view()).unwrap();
        ModelRunner::new().with_session(ctx)
    });
    let descriptor = SourceDescriptor::Table(TableSource::new("logins").unwrap());

    c.bench_function("load_registered_table", |b| {
        b.iter(|| black_box(rt.block_on(runner.load(&descriptor)).unwrap()))
    });
}

criterion_group!(
    benches,
    benchmark_row_plugins,
    benchmark_centrality,
    benchmark_table_load
);
criterion_main!(benches);
