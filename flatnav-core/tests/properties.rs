//! Property-based checks over randomly shaped inputs.

use std::sync::atomic::{AtomicUsize, Ordering};

use flatnav_core::{
    FlatCodec, Index, IndexParams, Invariant, Label, LowPrecisionConfig, Metric,
    ProductQuantizerConfig, ScaleGranularity, execute_in_parallel,
};
use flatnav_test_support::datasets::{BlobConfig, clustered, uniform};
use proptest::prelude::*;
use test_strategy::Arbitrary;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Arbitrary)]
enum Shape {
    #[weight(2)]
    Uniform,
    #[weight(1)]
    Clustered,
}

/// Dataset and graph parameters for one generated build.
#[derive(Clone, Copy, Debug, Arbitrary)]
struct BuildCase {
    shape: Shape,
    #[strategy(1_usize..40)]
    rows: usize,
    #[strategy(1_usize..6)]
    dimension: usize,
    #[strategy(1_usize..6)]
    max_edges: usize,
    #[strategy(1_usize..24)]
    ef_construction: usize,
    #[strategy(1_usize..4)]
    threads: usize,
    seed: u64,
}

impl BuildCase {
    fn data(&self) -> Vec<f32> {
        match self.shape {
            Shape::Uniform => uniform(self.rows, self.dimension, self.seed),
            Shape::Clustered => clustered(BlobConfig {
                rows: self.rows,
                dimension: self.dimension,
                clusters: 3,
                spread: 0.25,
                seed: self.seed,
            }),
        }
    }
}

fn granularity() -> impl Strategy<Value = ScaleGranularity> {
    prop_oneof![
        Just(ScaleGranularity::Global),
        Just(ScaleGranularity::PerDimension)
    ]
}

fn squared_error(left: &[f32], right: &[f32]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| f64::from(a - b).powi(2))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn built_graphs_keep_structural_invariants(case in any::<BuildCase>()) {
        let data = case.data();
        let index = Index::new(
            FlatCodec::new(Metric::Euclidean, case.dimension).expect("codec"),
            IndexParams::new(case.max_edges, case.rows).expect("params"),
        );
        let labels: Vec<Label> = (0..case.rows as Label).collect();
        index
            .insert_batch(&data, &labels, case.ef_construction, case.threads)
            .expect("build");
        prop_assert_eq!(index.len(), case.rows);
        let checked = index.invariants().check_many([
            Invariant::NeighbourValidity,
            Invariant::DegreeBounds,
            Invariant::BidirectionalLinks,
        ]);
        prop_assert!(checked.is_ok(), "{:?}", checked);

        let hits = index.search(&data[..case.dimension], 1, case.rows.max(1)).expect("search");
        prop_assert_eq!(hits.len(), 1);
    }

    #[test]
    fn low_precision_error_stays_within_half_a_step(
        rows in 1_usize..64,
        dimension in 1_usize..8,
        bits in 1_u8..=8,
        granularity in granularity(),
        seed in any::<u64>(),
    ) {
        let data = uniform(rows, dimension, seed);
        let quantizer = LowPrecisionConfig::new(dimension, bits, Metric::Euclidean)
            .expect("config")
            .with_granularity(granularity)
            .train(&data, rows)
            .expect("train");
        let levels = quantizer.config().levels();
        for row in data.chunks_exact(dimension) {
            let code = quantizer.encode(row).expect("encode");
            prop_assert!(code.iter().all(|&level| level <= levels));
            let decoded = quantizer.decode(&code).expect("decode");
            for (position, (original, approx)) in row.iter().zip(&decoded).enumerate() {
                let step = quantizer.delta()[position % quantizer.delta().len()];
                prop_assert!(
                    (original - approx).abs() <= step / 2.0 + 1e-5,
                    "component {} drifted from {} to {} with step {}",
                    position, original, approx, step
                );
            }
        }
    }

    #[test]
    fn product_error_never_exceeds_the_variance(
        bits in 1_u8..=3,
        subspaces in 1_usize..4,
        extra_rows in 0_usize..24,
        seed in any::<u64>(),
    ) {
        let dimension = 6;
        let rows = (1_usize << bits) + extra_rows;
        let data = uniform(rows, dimension, seed);
        let quantizer = ProductQuantizerConfig::new(dimension, subspaces, bits, Metric::Euclidean)
            .expect("config")
            .with_seed(seed)
            .train(&data, rows)
            .expect("train");

        let mut mean = vec![0.0_f32; dimension];
        for row in data.chunks_exact(dimension) {
            for (acc, value) in mean.iter_mut().zip(row) {
                *acc += value / rows as f32;
            }
        }
        let mut quantized = 0.0;
        let mut variance = 0.0;
        for row in data.chunks_exact(dimension) {
            let decoded = quantizer
                .decode(&quantizer.encode(row).expect("encode"))
                .expect("decode");
            quantized += squared_error(row, &decoded);
            variance += squared_error(row, &mean);
        }
        prop_assert!(
            quantized <= variance * 1.001 + 1e-6,
            "quantized error {} above variance {}",
            quantized,
            variance
        );
    }

    #[test]
    fn executor_visits_every_index_once(
        start in 0_usize..200,
        len in 0_usize..300,
        threads in 1_usize..9,
    ) {
        let visits: Vec<AtomicUsize> = (0..len).map(|_| AtomicUsize::new(0)).collect();
        execute_in_parallel(start, start + len, threads, |index| {
            visits[index - start].fetch_add(1, Ordering::Relaxed);
        })
        .expect("executor");
        prop_assert!(visits.iter().all(|count| count.load(Ordering::Relaxed) == 1));
    }
}
