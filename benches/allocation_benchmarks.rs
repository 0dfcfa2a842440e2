use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use product_grouping::allocation::{AllocationEngine, BatchPool, PoolBatch};
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

/// Deterministic pool with prices spread between 0.50 and 199.50.
fn pool(size: usize) -> BatchPool {
    BatchPool::new((0..size).map(|i| {
        let cents = 50 + ((i * 7_919) % 19_900) as i64;
        PoolBatch::new(
            Uuid::from_u128(i as u128 + 1),
            Decimal::new(cents, 2),
            1 + (i % 40) as i32,
        )
    }))
}

fn allocate_all_benchmark(c: &mut Criterion) {
    let engine = AllocationEngine::default();
    let mut group = c.benchmark_group("allocate_all");

    for size in [10, 100, 1_000].iter() {
        let template = pool(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &template, |b, template| {
            b.iter(|| {
                let mut pool = template.clone();
                black_box(engine.allocate_all(&mut pool))
            });
        });
    }

    group.finish();
}

fn fill_group_benchmark(c: &mut Criterion) {
    let engine = AllocationEngine::default();
    let template = pool(1_000);

    c.bench_function("fill_single_group", |b| {
        b.iter(|| {
            let mut pool = template.clone();
            black_box(engine.fill_group(&mut pool))
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = allocate_all_benchmark, fill_group_benchmark
}
criterion_main!(benches);
