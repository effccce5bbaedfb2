//! Recall@k against ground-truth neighbour lists.

use flatnav_core::{Label, SearchHit};

/// Mean fraction of each query's first `k` true neighbours that appear in
/// its returned hits.
///
/// Queries without ground truth count as fully recalled, as does an empty
/// result set. Extra ground-truth rows are ignored.
///
/// # Examples
/// ```
/// use flatnav_cli::cli::recall_at_k;
/// use flatnav_core::SearchHit;
///
/// let results = vec![vec![
///     SearchHit { label: 4, distance: 0.0 },
///     SearchHit { label: 9, distance: 1.0 },
/// ]];
/// let truth = vec![vec![4, 7, 1]];
/// assert!((recall_at_k(&results, &truth, 2) - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn recall_at_k(results: &[Vec<SearchHit>], truth: &[Vec<Label>], k: usize) -> f64 {
    let per_query: Vec<f64> = results
        .iter()
        .zip(truth)
        .map(|(hits, expected)| {
            let expected = &expected[..expected.len().min(k)];
            if expected.is_empty() {
                return 1.0;
            }
            let found = expected
                .iter()
                .filter(|label| hits.iter().any(|hit| hit.label == **label))
                .count();
            found as f64 / expected.len() as f64
        })
        .collect();
    if per_query.is_empty() {
        return 1.0;
    }
    per_query.iter().sum::<f64>() / per_query.len() as f64
}
