//! Structural invariant checks for the proximity graph.
//!
//! The checker is surfaced via [`crate::Index::invariants`] so tests can
//! assert graph health without reimplementing traversal logic.

use std::collections::VecDeque;

use thiserror::Error;

use crate::codec::{CodeElement, VectorCodec};

use super::{Graph, Index};

/// Structural invariants of a completed insertion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Invariant {
    /// Every neighbour id refers to an existing node other than the owner,
    /// and appears at most once.
    NeighbourValidity,
    /// No node holds more than `M` neighbours.
    DegreeBounds,
    /// If `a` lists `b` then `b` lists `a`.
    BidirectionalLinks,
    /// Every node is reachable from the entry point.
    Reachability,
}

impl Invariant {
    /// Returns all invariants in evaluation order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::NeighbourValidity,
            Self::DegreeBounds,
            Self::BidirectionalLinks,
            Self::Reachability,
        ]
    }
}

/// Reports an invariant violation surfaced by [`InvariantChecker`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InvariantViolation {
    /// A node references a missing node.
    #[error("node {origin} references missing node {target}")]
    DanglingNeighbour {
        /// Node holding the reference.
        origin: usize,
        /// Referenced id.
        target: usize,
    },
    /// A node lists itself.
    #[error("node {node} lists itself as a neighbour")]
    SelfLoop {
        /// Offending node.
        node: usize,
    },
    /// A node lists the same neighbour twice.
    #[error("node {origin} lists neighbour {target} more than once")]
    DuplicateNeighbour {
        /// Node holding the duplicate.
        origin: usize,
        /// Repeated id.
        target: usize,
    },
    /// A node exceeds the degree bound.
    #[error("node {node} has {degree} neighbours, exceeding limit {limit}")]
    DegreeBounds {
        /// Overflowing node.
        node: usize,
        /// Actual degree.
        degree: usize,
        /// Configured `M`.
        limit: usize,
    },
    /// A directed edge lacks its reverse.
    #[error("edge {origin}->{target} is missing the reverse link")]
    MissingBacklink {
        /// Source of the one-way edge.
        origin: usize,
        /// Target lacking the reverse edge.
        target: usize,
    },
    /// A node cannot be reached from the entry point.
    #[error("node {node} is unreachable from the entry point")]
    UnreachableNode {
        /// First unreachable node id.
        node: usize,
    },
}

/// Helper returned by [`Index::invariants`] to run structural checks.
#[derive(Debug)]
pub struct InvariantChecker<'index, C: VectorCodec> {
    index: &'index Index<C>,
}

impl<'index, C: VectorCodec> InvariantChecker<'index, C> {
    pub(super) fn new(index: &'index Index<C>) -> Self {
        Self { index }
    }

    /// Runs all invariants, returning the first violation encountered.
    ///
    /// # Examples
    /// ```
    /// use flatnav_core::{FlatCodec, Index, IndexParams, Metric};
    ///
    /// let codec = FlatCodec::new(Metric::Euclidean, 1).expect("codec");
    /// let index = Index::new(codec, IndexParams::new(2, 8).expect("params"));
    /// for x in 0..8 {
    ///     index.insert(&[x as f32], x, 8).expect("insert");
    /// }
    /// index.invariants().check_all().expect("graph must be valid");
    /// ```
    pub fn check_all(&self) -> Result<(), InvariantViolation> {
        self.check_many(Invariant::all())
    }

    /// Runs a custom subset of invariants in the provided order.
    pub fn check_many(
        &self,
        invariants: impl IntoIterator<Item = Invariant>,
    ) -> Result<(), InvariantViolation> {
        let graph = self.index.graph_guard();
        let limit = self.index.params().max_edges();
        for invariant in invariants {
            match invariant {
                Invariant::NeighbourValidity => check_neighbour_validity(&graph)?,
                Invariant::DegreeBounds => check_degree_bounds(&graph, limit)?,
                Invariant::BidirectionalLinks => check_bidirectional(&graph)?,
                Invariant::Reachability => check_reachability(&graph)?,
            }
        }
        Ok(())
    }

    /// Runs a single invariant.
    pub fn check(&self, invariant: Invariant) -> Result<(), InvariantViolation> {
        self.check_many([invariant])
    }

    /// Number of nodes reachable from the entry point by breadth-first
    /// traversal.
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        let graph = self.index.graph_guard();
        reachable(&graph).iter().filter(|&&seen| seen).count()
    }
}

fn check_neighbour_validity<E: CodeElement>(graph: &Graph<E>) -> Result<(), InvariantViolation> {
    let len = graph.len();
    for origin in 0..len {
        let list = graph.neighbours(origin);
        for (position, &target) in list.iter().enumerate() {
            if target >= len {
                return Err(InvariantViolation::DanglingNeighbour { origin, target });
            }
            if target == origin {
                return Err(InvariantViolation::SelfLoop { node: origin });
            }
            if list.get(..position).is_some_and(|seen| seen.contains(&target)) {
                return Err(InvariantViolation::DuplicateNeighbour { origin, target });
            }
        }
    }
    Ok(())
}

fn check_degree_bounds<E: CodeElement>(graph: &Graph<E>, limit: usize) -> Result<(), InvariantViolation> {
    match (0..graph.len()).find(|&node| graph.degree(node) > limit) {
        Some(node) => Err(InvariantViolation::DegreeBounds {
            node,
            degree: graph.degree(node),
            limit,
        }),
        None => Ok(()),
    }
}

fn check_bidirectional<E: CodeElement>(graph: &Graph<E>) -> Result<(), InvariantViolation> {
    for origin in 0..graph.len() {
        for &target in graph.neighbours(origin) {
            if !graph.neighbours(target).contains(&origin) {
                return Err(InvariantViolation::MissingBacklink { origin, target });
            }
        }
    }
    Ok(())
}

fn check_reachability<E: CodeElement>(graph: &Graph<E>) -> Result<(), InvariantViolation> {
    match reachable(graph).iter().position(|&seen| !seen) {
        Some(node) => Err(InvariantViolation::UnreachableNode { node }),
        None => Ok(()),
    }
}

fn reachable<E: CodeElement>(graph: &Graph<E>) -> Vec<bool> {
    let mut seen = vec![false; graph.len()];
    let Some(entry) = graph.entry() else {
        return seen;
    };
    let mut queue = VecDeque::from([entry]);
    if let Some(flag) = seen.get_mut(entry) {
        *flag = true;
    }
    while let Some(node) = queue.pop_front() {
        for &next in graph.neighbours(node) {
            if let Some(flag) = seen.get_mut(next)
                && !*flag
            {
                *flag = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(adjacency: Vec<Vec<usize>>) -> Graph<f32> {
        let len = adjacency.len();
        Graph::from_parts(1, vec![0.0; len], (0..len as u64).collect(), adjacency)
    }

    #[test]
    fn detects_missing_backlinks() {
        let g = graph(vec![vec![1], vec![]]);
        assert_eq!(
            check_bidirectional(&g),
            Err(InvariantViolation::MissingBacklink {
                origin: 0,
                target: 1
            })
        );
    }

    #[test]
    fn detects_unreachable_nodes() {
        let g = graph(vec![vec![1], vec![0], vec![]]);
        assert_eq!(
            check_reachability(&g),
            Err(InvariantViolation::UnreachableNode { node: 2 })
        );
        assert_eq!(reachable(&g), vec![true, true, false]);
    }

    #[test]
    fn detects_invalid_neighbour_lists() {
        assert_eq!(
            check_neighbour_validity(&graph(vec![vec![0]])),
            Err(InvariantViolation::SelfLoop { node: 0 })
        );
        assert_eq!(
            check_neighbour_validity(&graph(vec![vec![1, 1], vec![0]])),
            Err(InvariantViolation::DuplicateNeighbour {
                origin: 0,
                target: 1
            })
        );
        assert_eq!(
            check_neighbour_validity(&graph(vec![vec![4]])),
            Err(InvariantViolation::DanglingNeighbour {
                origin: 0,
                target: 4
            })
        );
    }

    #[test]
    fn detects_degree_overflow() {
        let g = graph(vec![vec![1, 2], vec![0], vec![0]]);
        assert!(check_degree_bounds(&g, 2).is_ok());
        assert_eq!(
            check_degree_bounds(&g, 1),
            Err(InvariantViolation::DegreeBounds {
                node: 0,
                degree: 2,
                limit: 1
            })
        );
    }
}
