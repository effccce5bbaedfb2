//! Diversity heuristic used for neighbour selection and degree pruning.
//!
//! A candidate is admitted only if no already-admitted neighbour is strictly
//! closer to it than the base point is. Candidates are considered in
//! ascending `(distance, id)` order.

use super::types::Neighbour;

/// Picks up to `limit` diverse neighbours from `candidates`.
///
/// `candidates` must already be sorted ascending. `pair` returns the distance
/// between two stored nodes.
pub(crate) fn select_diverse<P>(candidates: &[Neighbour], limit: usize, pair: P) -> Vec<Neighbour>
where
    P: Fn(usize, usize) -> f32,
{
    let mut admitted: Vec<Neighbour> = Vec::with_capacity(limit);
    for &candidate in candidates {
        if admitted.len() >= limit {
            break;
        }
        if !is_shadowed(&admitted, candidate, &pair) {
            admitted.push(candidate);
        }
    }
    admitted
}

/// Re-runs the heuristic over an overflowing adjacency list.
///
/// Returns the ids it admits (at most `limit`) and the ids to drop, which
/// include every shadowed candidate even when fewer than `limit` survive.
pub(crate) fn prune_diverse<P>(mut candidates: Vec<Neighbour>, limit: usize, pair: P) -> (Vec<usize>, Vec<usize>)
where
    P: Fn(usize, usize) -> f32,
{
    candidates.sort_unstable();
    let admitted = select_diverse(&candidates, limit, pair);
    let kept: Vec<usize> = admitted.iter().map(|n| n.id).collect();
    let dropped = candidates
        .iter()
        .map(|n| n.id)
        .filter(|id| !kept.contains(id))
        .collect();
    (kept, dropped)
}

fn is_shadowed<P>(admitted: &[Neighbour], candidate: Neighbour, pair: &P) -> bool
where
    P: Fn(usize, usize) -> f32,
{
    admitted
        .iter()
        .any(|kept| pair(kept.id, candidate.id) < candidate.distance)
}
