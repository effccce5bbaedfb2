//! Exact nearest neighbours for measuring approximate search quality.

use std::cmp::Ordering;

/// Squared Euclidean distance.
#[must_use]
pub fn squared_euclidean(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// Inner-product distance, `1 - <left, right>`.
#[must_use]
pub fn inner_product(left: &[f32], right: &[f32]) -> f32 {
    1.0 - left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>()
}

/// Row ids of the `k` rows of `data` closest to `query`.
///
/// Ties break towards the lower row id.
///
/// # Examples
/// ```
/// use flatnav_test_support::oracle::{brute_force_top_k, squared_euclidean};
///
/// let data = [0.0, 4.0, 1.0, 2.0];
/// let ids = brute_force_top_k(&data, 1, &[1.5], 2, squared_euclidean);
/// assert_eq!(ids, vec![2, 3]);
/// ```
pub fn brute_force_top_k<D>(
    data: &[f32],
    dimension: usize,
    query: &[f32],
    k: usize,
    distance: D,
) -> Vec<usize>
where
    D: Fn(&[f32], &[f32]) -> f32,
{
    if dimension == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f32, usize)> = data
        .chunks_exact(dimension)
        .enumerate()
        .map(|(id, row)| (distance(query, row), id))
        .collect();
    scored.sort_by(|a, b| compare_scores(*a, *b));
    scored.into_iter().take(k).map(|(_, id)| id).collect()
}

/// Fraction of `truth` found in `found`, in `[0, 1]`.
///
/// Returns 1 when `truth` is empty.
#[must_use]
pub fn recall<T: PartialEq>(found: &[T], truth: &[T]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let hits = truth.iter().filter(|id| found.contains(id)).count();
    hits as f64 / truth.len() as f64
}

/// Mean of [`recall`] over paired result lists.
#[must_use]
pub fn mean_recall<T: PartialEq>(found: &[Vec<T>], truth: &[Vec<T>]) -> f64 {
    let pairs = found.len().min(truth.len());
    if pairs == 0 {
        return 1.0;
    }
    let total: f64 = found
        .iter()
        .zip(truth)
        .map(|(f, t)| recall(f, t))
        .sum();
    total / pairs as f64
}

/// Orders `(distance, id)` pairs the way search results are ordered.
#[must_use]
pub fn compare_scores(left: (f32, usize), right: (f32, usize)) -> Ordering {
    left.0.total_cmp(&right.0).then(left.1.cmp(&right.1))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[1, 2, 3], &[1, 2, 3], 1.0)]
    #[case(&[1, 9, 8], &[1, 2, 3], 1.0 / 3.0)]
    #[case(&[], &[1, 2], 0.0)]
    #[case(&[4], &[], 1.0)]
    fn recall_counts_shared_ids(#[case] found: &[u64], #[case] truth: &[u64], #[case] expected: f64) {
        assert!((recall(found, truth) - expected).abs() < 1e-12);
    }

    #[test]
    fn inner_product_prefers_aligned_rows() {
        let data = [1.0, 0.0, 0.0, 1.0, 0.7, 0.7];
        let ids = brute_force_top_k(&data, 2, &[0.0, 1.0], 3, inner_product);
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn ties_break_on_the_lower_id() {
        assert_eq!(compare_scores((1.0, 3), (1.0, 2)), Ordering::Greater);
        let data = [1.0, -1.0];
        assert_eq!(
            brute_force_top_k(&data, 1, &[0.0], 2, squared_euclidean),
            vec![0, 1]
        );
    }
}
