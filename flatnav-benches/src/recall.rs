//! Recall measurement helpers for search quality reporting.
//!
//! Provides an exhaustive-scan oracle, a set-intersection recall scorer,
//! and a CSV report writer so benchmarks can chart recall against
//! `ef_search`.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use flatnav_core::{Label, Metric, SearchHit};

/// Integer-only recall score; convert to a fraction only when reporting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RecallScore {
    /// True neighbours found by the approximate search.
    pub hits: usize,
    /// Target count, `min(k, oracle.len())`.
    pub total: usize,
}

impl RecallScore {
    /// Sums two scores.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            hits: self.hits.saturating_add(other.hits),
            total: self.total.saturating_add(other.total),
        }
    }
}

/// Labels of the `k` rows of `data` closest to `query`, nearest first.
///
/// Row numbers double as labels. Ties go to the lower row.
#[must_use]
pub fn brute_force_top_k(
    data: &[f32],
    dimension: usize,
    query: &[f32],
    k: usize,
    metric: Metric,
) -> Vec<Label> {
    if dimension == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f32, usize)> = data
        .chunks_exact(dimension)
        .map(|row| metric.distance(query, row))
        .zip(0..)
        .collect();
    scored.sort_by(|left, right| left.0.total_cmp(&right.0).then(left.1.cmp(&right.1)));
    scored
        .into_iter()
        .take(k)
        .map(|(_, row)| row as Label)
        .collect()
}

/// Overlap between the first `k` oracle labels and the observed hits.
///
/// # Examples
///
/// ```
/// use flatnav_benches::recall::{RecallScore, recall_at_k};
/// use flatnav_core::SearchHit;
///
/// let observed = [
///     SearchHit { label: 0, distance: 0.1 },
///     SearchHit { label: 2, distance: 0.3 },
/// ];
/// assert_eq!(recall_at_k(&[0, 1], &observed, 2), RecallScore { hits: 1, total: 2 });
/// ```
#[must_use]
pub fn recall_at_k(oracle: &[Label], observed: &[SearchHit], k: usize) -> RecallScore {
    let target = k.min(oracle.len());
    let expected: HashSet<Label> = oracle.iter().take(target).copied().collect();
    let hits = observed
        .iter()
        .take(k)
        .filter(|hit| expected.contains(&hit.label))
        .count();
    RecallScore {
        hits,
        total: target,
    }
}

/// A single row in the recall-versus-`ef_search` report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecallMeasurement {
    /// Number of indexed vectors.
    pub point_count: usize,
    /// Maximum out-degree (M).
    pub max_edges: usize,
    /// Beam width during search.
    pub ef_search: usize,
    /// Aggregated recall across all queries.
    pub recall: RecallScore,
    /// Wall-clock time for the whole query batch in microseconds.
    pub search_micros: u128,
}

impl RecallMeasurement {
    const fn csv_header() -> &'static str {
        "point_count,max_edges,ef_search,recall_hits,recall_total,recall_fraction,search_us\n"
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}\n",
            self.point_count,
            self.max_edges,
            self.ef_search,
            self.recall.hits,
            self.recall.total,
            recall_fraction(self.recall),
            self.search_micros,
        )
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "Recall fraction is a float ratio used only in CSV output."
)]
fn recall_fraction(score: RecallScore) -> String {
    if score.total == 0 {
        return "0.000000".to_owned();
    }
    format!("{:.6}", score.hits as f64 / score.total as f64)
}

/// Writes recall records to a CSV file, creating parent directories.
///
/// # Errors
///
/// Returns [`std::io::Error`] if directory creation or file writing fails.
pub fn write_recall_report(
    report_path: impl AsRef<Path>,
    records: &[RecallMeasurement],
) -> Result<PathBuf, std::io::Error> {
    let path = report_path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut output = String::from(RecallMeasurement::csv_header());
    for record in records {
        output.push_str(&record.to_csv_row());
    }
    fs::write(&path, output)?;
    Ok(path)
}
