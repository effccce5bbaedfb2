//! Optional counters and histograms emitted through the `metrics` facade.

use std::time::Duration;

#[cfg(feature = "metrics")]
pub(crate) fn record_insertion() {
    metrics::counter!("flatnav_insertions_total").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_insertion() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_pruned(edges: usize) {
    metrics::counter!("flatnav_pruned_edges_total").increment(edges as u64);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_pruned(_edges: usize) {}

#[cfg(feature = "metrics")]
pub(crate) fn record_search(elapsed: Duration) {
    metrics::counter!("flatnav_searches_total").increment(1);
    metrics::histogram!("flatnav_search_latency_seconds").record(elapsed.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_search(_elapsed: Duration) {}
