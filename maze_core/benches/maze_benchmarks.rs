//! Generation and solving cost at the background scene size and above.
//!
//! Run with: `cargo bench -p maze-core --bench maze_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maze_core::{generate_seeded, shortest_path, Coord};

const SIZES: [(usize, usize); 3] = [(51, 31), (201, 201), (801, 801)];

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for (w, h) in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &(w, h), |b, &(w, h)| {
            b.iter(|| generate_seeded(black_box(w), black_box(h), 7).unwrap());
        });
    }
    group.finish();
}

fn bench_shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest_path");
    for (w, h) in SIZES {
        let grid = generate_seeded(w, h, 7).unwrap();
        let end = Coord::new(w - 2, h - 2);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &grid, |b, grid| {
            b.iter(|| shortest_path(black_box(grid), Coord::new(1, 1), end));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_shortest_path);
criterion_main!(benches);
