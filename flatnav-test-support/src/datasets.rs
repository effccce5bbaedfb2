//! Seeded synthetic datasets in row-major `f32` layout.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// `rows` vectors with components drawn uniformly from `[-1, 1)`.
///
/// # Examples
/// ```
/// use flatnav_test_support::datasets::uniform;
///
/// let data = uniform(10, 4, 7);
/// assert_eq!(data.len(), 40);
/// assert_eq!(data, uniform(10, 4, 7));
/// ```
#[must_use]
pub fn uniform(rows: usize, dimension: usize, seed: u64) -> Vec<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..rows * dimension)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect()
}

/// Shape of a [`clustered`] dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobConfig {
    /// Number of vectors.
    pub rows: usize,
    /// Components per vector.
    pub dimension: usize,
    /// Number of cluster centres.
    pub clusters: usize,
    /// Half-width of the uniform jitter around each centre.
    pub spread: f32,
    /// Seed for the generator.
    pub seed: u64,
}

/// Vectors scattered around `clusters` random centres in `[-10, 10)`.
///
/// Row `i` belongs to cluster `i % clusters`. A zero cluster count or
/// dimension yields an empty dataset.
#[must_use]
pub fn clustered(config: BlobConfig) -> Vec<f32> {
    if config.clusters == 0 || config.dimension == 0 {
        return Vec::new();
    }
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let centres: Vec<f32> = (0..config.clusters * config.dimension)
        .map(|_| rng.gen_range(-10.0..10.0))
        .collect();
    let spread = config.spread.abs().max(f32::EPSILON);
    let mut data = Vec::with_capacity(config.rows * config.dimension);
    for centre in centres.chunks_exact(config.dimension).cycle().take(config.rows) {
        data.extend(centre.iter().map(|c| c + rng.gen_range(-spread..spread)));
    }
    data
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn clustered_rows_stay_near_their_centre(#[case] seed: u64) {
        let config = BlobConfig {
            rows: 30,
            dimension: 3,
            clusters: 3,
            spread: 0.5,
            seed,
        };
        let data = clustered(config);
        assert_eq!(data.len(), 90);
        let rows: Vec<&[f32]> = data.chunks_exact(3).collect();
        for (i, row) in rows.iter().enumerate().skip(3) {
            let sibling = rows[i - 3];
            for (a, b) in row.iter().zip(sibling) {
                assert!((a - b).abs() <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn zero_clusters_give_no_rows() {
        let config = BlobConfig {
            rows: 4,
            dimension: 2,
            clusters: 0,
            spread: 1.0,
            seed: 1,
        };
        assert!(clustered(config).is_empty());
    }
}
