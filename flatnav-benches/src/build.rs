//! Index construction shared by the benchmarks.

use std::num::NonZeroUsize;
use std::thread;

use flatnav_core::{FlatCodec, Index, IndexParams, Label, Metric, VectorCodec};

use crate::{error::BenchSetupError, params::BuildBenchParams, source::SyntheticSource};

/// Worker count used for batch operations.
#[must_use]
pub fn bench_threads() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Inserts every row of `source` into a fresh index over `codec`.
///
/// Labels are row numbers.
///
/// # Errors
///
/// Returns [`BenchSetupError::Index`] if parameters are invalid or an
/// insertion fails.
pub fn build_index<C: VectorCodec>(
    codec: C,
    source: &SyntheticSource,
    params: BuildBenchParams,
    threads: usize,
) -> Result<Index<C>, BenchSetupError> {
    let index = Index::new(codec, IndexParams::new(params.max_edges, source.len())?);
    let labels: Vec<Label> = (0..).take(source.len()).collect();
    index.insert_batch(source.data(), &labels, params.ef_construction, threads)?;
    Ok(index)
}

/// [`build_index`] with raw `f32` storage under squared Euclidean distance.
///
/// # Errors
///
/// As [`build_index`], plus [`BenchSetupError::Distance`] for a
/// zero-dimensional source.
///
/// # Examples
///
/// ```
/// use flatnav_benches::build::build_flat_index;
/// use flatnav_benches::params::BuildBenchParams;
/// use flatnav_benches::source::{SyntheticConfig, SyntheticSource};
///
/// let config = SyntheticConfig { point_count: 64, dimensions: 4, seed: 1 };
/// let source = SyntheticSource::generate(&config).expect("valid config");
/// let params = BuildBenchParams { point_count: 64, max_edges: 8, ef_construction: 16 };
/// let index = build_flat_index(&source, params, 2).expect("build");
/// assert_eq!(index.len(), 64);
/// ```
pub fn build_flat_index(
    source: &SyntheticSource,
    params: BuildBenchParams,
    threads: usize,
) -> Result<Index<FlatCodec>, BenchSetupError> {
    let codec = FlatCodec::new(Metric::Euclidean, source.dimensions())?;
    build_index(codec, source, params, threads)
}
