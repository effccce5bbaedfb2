//! Benchmark parameter types.
//!
//! Each type renders a compact `Display` form used as the Criterion
//! benchmark id.

use std::fmt;

/// Parameters for an index construction run.
#[derive(Clone, Copy, Debug)]
pub struct BuildBenchParams {
    /// Number of vectors inserted.
    pub point_count: usize,
    /// Maximum out-degree (M).
    pub max_edges: usize,
    /// Beam width during insertion.
    pub ef_construction: usize,
}

impl fmt::Display for BuildBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},M={},ef={}",
            self.point_count, self.max_edges, self.ef_construction
        )
    }
}

/// Parameters for a batch search run.
#[derive(Clone, Copy, Debug)]
pub struct SearchBenchParams {
    /// Results per query.
    pub top_k: usize,
    /// Beam width during search.
    pub ef_search: usize,
}

impl fmt::Display for SearchBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k={},ef={}", self.top_k, self.ef_search)
    }
}

/// Parameters for a quantizer training run.
#[derive(Clone, Copy, Debug)]
pub struct QuantizerBenchParams {
    /// Number of training vectors.
    pub point_count: usize,
    /// Bits per code element.
    pub bits: u8,
}

impl fmt::Display for QuantizerBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},bits={}", self.point_count, self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_compact() {
        let build = BuildBenchParams {
            point_count: 1_000,
            max_edges: 16,
            ef_construction: 100,
        };
        assert_eq!(build.to_string(), "n=1000,M=16,ef=100");
        let search = SearchBenchParams {
            top_k: 10,
            ef_search: 64,
        };
        assert_eq!(search.to_string(), "k=10,ef=64");
    }
}
