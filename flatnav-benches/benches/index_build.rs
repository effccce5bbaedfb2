//! Index construction benchmarks.
//!
//! Sweeps dataset size and maximum out-degree with `ef_construction` held
//! fixed, inserting through the parallel batch path.
use criterion::{BenchmarkId, Criterion, criterion_main};

use flatnav_benches::{
    build::{bench_threads, build_flat_index},
    error::BenchSetupError,
    params::BuildBenchParams,
    source::{SyntheticConfig, SyntheticSource},
};

const POINT_COUNTS: &[usize] = &[1_000, 5_000];
const MAX_EDGES: &[usize] = &[8, 16, 32];
const EF_CONSTRUCTION: usize = 100;
const DIMENSIONS: usize = 32;
const SEED: u64 = 42;

fn index_build_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let threads = bench_threads();
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);

    for &point_count in POINT_COUNTS {
        let source = SyntheticSource::generate(&SyntheticConfig {
            point_count,
            dimensions: DIMENSIONS,
            seed: SEED,
        })?;
        for &max_edges in MAX_EDGES {
            let params = BuildBenchParams {
                point_count,
                max_edges,
                ef_construction: EF_CONSTRUCTION,
            };
            group.bench_with_input(BenchmarkId::from_parameter(params), &params, |b, &params| {
                b.iter(|| {
                    if let Err(err) = build_flat_index(&source, params, threads) {
                        panic!("index_build failed during benchmark: {err}");
                    }
                });
            });
        }
    }

    group.finish();
    Ok(())
}

fn index_build(c: &mut Criterion) {
    if let Err(err) = index_build_impl(c) {
        panic!("index_build benchmark setup failed: {err}");
    }
}

mod bench_harness {
    use super::index_build;
    use criterion::criterion_group;

    criterion_group!(benches, index_build);
}
criterion_main!(bench_harness::benches);
