//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use callable_loci::callable::{classify_counts, CallableParams, PileupCounts};
use callable_loci::coverage::CoverageAccumulator;
use callable_loci::genomics::PileupRead;

fn column(depth: usize) -> Vec<PileupRead> {
    (0..depth)
        .map(|i| match i % 10 {
            0 => PileupRead::new(0, 30),
            1 => PileupRead::deletion(60),
            2 => PileupRead::new(60, 12),
            _ => PileupRead::new(60, 35),
        })
        .collect()
}

fn benchmark_classify_observe(c: &mut Criterion) {
    let params = CallableParams::default();
    let mut group = c.benchmark_group("classify_observe");

    for depth in [0usize, 30, 300] {
        let reads = column(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &reads, |b, reads| {
            b.iter(|| {
                let mut accumulator = CoverageAccumulator::new();
                for pos in 0..10_000u32 {
                    let counts = PileupCounts::tally(black_box(reads), &params);
                    let base = if pos % 1_000 == 0 { b'N' } else { b'A' };
                    let state = classify_counts(base, &counts, &params);
                    accumulator.observe(state, counts.qc_depth);
                }
                black_box(accumulator.positions())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_classify_observe);
criterion_main!(benches);
