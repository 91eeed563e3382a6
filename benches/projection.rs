//! Benchmarks for projection construction and fly hashing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flyhash::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PN_SIZE: usize = 10_000;

fn bench_projection_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_build");

    for selector in 0..4_u8 {
        let strategy = ProjectionStrategy::from_index(selector).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(selector), &strategy, |b, &s| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| ProjectionMatrix::build(PN_SIZE, black_box(5000), 10, s, &mut rng).unwrap());
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("fly_hash_encode");
    let mut rng = StdRng::seed_from_u64(7);

    // 200 documents with 150 distinct pieces each
    let docs = SparseMatrix::from_rows(
        PN_SIZE,
        (0..200).map(|_| {
            (0..150)
                .map(|_| (rng.gen_range(0..PN_SIZE), rng.gen_range(1.0..50.0_f32)))
                .collect::<Vec<_>>()
        }),
    )
    .unwrap();

    for kc_size in [1000, 5000, 15000].iter() {
        let fly = Fly::new(PN_SIZE, *kc_size, 10, 300, ProjectionStrategy::default(), &mut rng)
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(kc_size), kc_size, |b, _| {
            b.iter(|| {
                FlyHashEncoder
                    .encode(black_box(&docs), fly.projection(), fly.wta_percent(), 400)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_projection_build, bench_encode);
criterion_main!(benches);
