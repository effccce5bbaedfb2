//! Best-first beam search over the single-layer graph.
//!
//! Two heaps drive the traversal: a min-heap frontier of unexpanded nodes and
//! a max-heap of the best `ef` nodes seen so far. The walk stops once the
//! closest unexpanded node is farther than the worst kept result while the
//! result set is full.

use std::{
    cmp::Reverse,
    collections::BinaryHeap,
};

use tracing::trace;

use crate::codec::CodeElement;

use super::{
    graph::Graph,
    types::{Frontier, Neighbour},
    visited::with_visited,
};

/// Returns up to `ef` nodes closest to the query, ascending by
/// `(distance, id)`.
///
/// `distance` scores a stored code against the query. An empty graph yields
/// an empty result.
pub(crate) fn beam_search<E, D>(graph: &Graph<E>, ef: usize, distance: D) -> Vec<Neighbour>
where
    E: CodeElement,
    D: Fn(&[E]) -> f32,
{
    let Some(entry) = graph.entry() else {
        return Vec::new();
    };
    let ef = ef.max(1);

    with_visited(graph.len(), |visited| {
        let seed = Neighbour {
            id: entry,
            distance: distance(graph.code(entry)),
        };
        visited.insert(entry);

        let mut frontier: BinaryHeap<Frontier> = BinaryHeap::with_capacity(ef * 2);
        let mut best: BinaryHeap<Neighbour> = BinaryHeap::with_capacity(ef + 1);
        frontier.push(Reverse(seed));
        best.push(seed);
        let mut expanded = 0_usize;

        while let Some(Reverse(current)) = frontier.pop() {
            if best.len() >= ef && best.peek().is_some_and(|worst| current.distance > worst.distance)
            {
                break;
            }
            expanded += 1;
            for &next in graph.neighbours(current.id) {
                if !visited.insert(next) {
                    continue;
                }
                let candidate = Neighbour {
                    id: next,
                    distance: distance(graph.code(next)),
                };
                let admit = best.len() < ef || best.peek().is_some_and(|worst| candidate < *worst);
                if !admit {
                    continue;
                }
                frontier.push(Reverse(candidate));
                best.push(candidate);
                if best.len() > ef {
                    best.pop();
                }
            }
        }
        trace!(expanded, ef, "beam search finished");

        let mut results = best.into_vec();
        results.sort_unstable();
        results
    })
}
