//! Seeded synthetic vectors for benchmarking.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors that may occur during synthetic source generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
}

/// Configuration for synthetic vector generation.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each vector.
    pub dimensions: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Row-major vectors drawn uniformly from `[-1, 1)`.
///
/// # Examples
///
/// ```
/// use flatnav_benches::source::{SyntheticConfig, SyntheticSource};
///
/// let config = SyntheticConfig { point_count: 10, dimensions: 4, seed: 42 };
/// let source = SyntheticSource::generate(&config).expect("valid config");
/// assert_eq!(source.len(), 10);
/// assert_eq!(source.data().len(), 40);
/// ```
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    data: Vec<f32>,
    point_count: usize,
    dimensions: usize,
}

impl SyntheticSource {
    /// Generates vectors eagerly from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyntheticError::ZeroPoints`] if `point_count` is zero,
    /// or [`SyntheticError::ZeroDimensions`] if `dimensions` is zero.
    pub fn generate(config: &SyntheticConfig) -> Result<Self, SyntheticError> {
        if config.point_count == 0 {
            return Err(SyntheticError::ZeroPoints);
        }
        if config.dimensions == 0 {
            return Err(SyntheticError::ZeroDimensions);
        }

        let total = config.point_count.saturating_mul(config.dimensions);
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let data: Vec<f32> = (0..total)
            .map(|_| rng.gen_range(-1.0_f32..1.0_f32))
            .collect();

        Ok(Self {
            data,
            point_count: config.point_count,
            dimensions: config.dimensions,
        })
    }

    /// Number of vectors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.point_count
    }

    /// Always `false`; generation rejects empty sources.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Dimensionality of each vector.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Row-major buffer of every vector.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Vector `index`, if present.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimensions)?;
        self.data.get(start..start.checked_add(self.dimensions)?)
    }

    /// Row-major copy of `count` evenly spaced rows, for use as queries.
    #[must_use]
    pub fn sample_rows(&self, count: usize) -> Vec<f32> {
        (0..count)
            .filter_map(|ordinal| self.row(spread_index(ordinal, count, self.point_count)))
            .flatten()
            .copied()
            .collect()
    }
}

/// Maps `ordinal` in `0..count` onto `0..len` without favouring either end.
#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "Intentional truncating division to produce evenly spaced indices."
)]
const fn spread_index(ordinal: usize, count: usize, len: usize) -> usize {
    ordinal.saturating_add(1).saturating_mul(len) / count.saturating_add(1)
}
