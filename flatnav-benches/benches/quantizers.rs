//! Quantizer training and encoding benchmarks.
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_main};

use flatnav_benches::{
    error::BenchSetupError,
    params::QuantizerBenchParams,
    source::{SyntheticConfig, SyntheticSource},
};
use flatnav_core::{LowPrecisionConfig, Metric, ProductQuantizerConfig, ScaleGranularity};

const POINT_COUNT: usize = 5_000;
const DIMENSIONS: usize = 32;
const PQ_SUBSPACES: usize = 8;
const BITS: &[u8] = &[4, 8];

fn quantizers_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let source = SyntheticSource::generate(&SyntheticConfig {
        point_count: POINT_COUNT,
        dimensions: DIMENSIONS,
        seed: 5,
    })?;
    let sample = source.sample_rows(256);

    let mut train = c.benchmark_group("quantizer_train");
    train.sample_size(10);
    for &bits in BITS {
        let params = QuantizerBenchParams {
            point_count: POINT_COUNT,
            bits,
        };
        let pq = ProductQuantizerConfig::new(DIMENSIONS, PQ_SUBSPACES, bits, Metric::Euclidean)?
            .with_iterations(10)?;
        train.bench_with_input(BenchmarkId::new("pq", params), &pq, |b, config| {
            b.iter(|| black_box(config.train(source.data(), source.len())));
        });
        let lpq = LowPrecisionConfig::new(DIMENSIONS, bits, Metric::Euclidean)?
            .with_granularity(ScaleGranularity::PerDimension);
        train.bench_with_input(BenchmarkId::new("lpq", params), &lpq, |b, config| {
            b.iter(|| black_box(config.train(source.data(), source.len())));
        });
    }
    train.finish();

    let pq = ProductQuantizerConfig::new(DIMENSIONS, PQ_SUBSPACES, 8, Metric::Euclidean)?
        .train(source.data(), source.len())?;
    let lpq = LowPrecisionConfig::new(DIMENSIONS, 8, Metric::Euclidean)?
        .train(source.data(), source.len())?;
    let mut encode = c.benchmark_group("quantizer_encode");
    encode.bench_function("pq", |b| {
        b.iter(|| {
            for row in sample.chunks_exact(DIMENSIONS) {
                let _code = black_box(pq.encode(row));
            }
        });
    });
    encode.bench_function("lpq", |b| {
        b.iter(|| {
            for row in sample.chunks_exact(DIMENSIONS) {
                let _code = black_box(lpq.encode(row));
            }
        });
    });
    encode.finish();
    Ok(())
}

fn quantizers(c: &mut Criterion) {
    if let Err(err) = quantizers_impl(c) {
        panic!("quantizer benchmark setup failed: {err}");
    }
}

mod bench_harness {
    use super::quantizers;
    use criterion::criterion_group;

    criterion_group!(benches, quantizers);
}
criterion_main!(bench_harness::benches);
