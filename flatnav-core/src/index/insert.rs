//! Two-phase insertion: planning under a shared lock, commit under an
//! exclusive one.
//!
//! Planning runs the beam search and the diversity heuristic against a
//! read-locked snapshot, so concurrent insertions plan in parallel. The
//! commit appends the node, links back-edges, and prunes any neighbour that
//! overflowed `M`. Nodes are never removed, so neighbour ids chosen during
//! planning stay valid at commit time even if other insertions landed in
//! between.

use tracing::trace;

use crate::codec::VectorCodec;

use super::{
    error::IndexError,
    graph::Graph,
    search::beam_search,
    select::{prune_diverse, select_diverse},
    telemetry,
    types::{Label, Neighbour},
};

/// Output of the planning phase.
#[derive(Debug)]
pub(crate) struct InsertionPlan {
    pub(crate) neighbours: Vec<usize>,
}

pub(crate) struct InsertionPlanner<'a, C: VectorCodec> {
    pub(crate) codec: &'a C,
    pub(crate) graph: &'a Graph<C::Element>,
    pub(crate) max_edges: usize,
}

impl<C: VectorCodec> InsertionPlanner<'_, C> {
    /// Chooses neighbours for a node whose raw vector is `vector` and whose
    /// code is `code`.
    pub(crate) fn plan(&self, vector: &[f32], code: &[C::Element], ef: usize) -> InsertionPlan {
        let query = self.codec.prepare_query(vector);
        let found = beam_search(self.graph, ef, |stored| {
            self.codec.query_distance(&query, stored)
        });

        let mut candidates: Vec<Neighbour> = found
            .into_iter()
            .map(|hit| Neighbour {
                id: hit.id,
                distance: self.codec.code_distance(code, self.graph.code(hit.id)),
            })
            .collect();
        candidates.sort_unstable();

        let selected = select_diverse(&candidates, self.max_edges, |a, b| {
            self.codec.code_distance(self.graph.code(a), self.graph.code(b))
        });
        trace!(
            candidates = candidates.len(),
            selected = selected.len(),
            "insertion planned"
        );
        InsertionPlan {
            neighbours: selected.into_iter().map(|n| n.id).collect(),
        }
    }
}

pub(crate) struct InsertionCommitter<'a, C: VectorCodec> {
    pub(crate) codec: &'a C,
    pub(crate) graph: &'a mut Graph<C::Element>,
    pub(crate) max_edges: usize,
    pub(crate) capacity: usize,
}

impl<C: VectorCodec> InsertionCommitter<'_, C> {
    /// Appends the planned node, links back-edges and restores the degree
    /// bound on every neighbour. Returns the new node id.
    pub(crate) fn commit(
        &mut self,
        code: &[C::Element],
        label: Label,
        plan: InsertionPlan,
    ) -> Result<usize, IndexError> {
        self.ensure_capacity()?;
        let neighbours = plan.neighbours;
        let id = self.graph.push(code, label, neighbours.clone());

        let mut pruned = 0;
        for neighbour in neighbours {
            let Some(list) = self.graph.neighbours_mut(neighbour) else {
                continue;
            };
            list.push(id);
            if list.len() > self.max_edges {
                pruned += self.prune(neighbour);
            }
        }
        telemetry::record_pruned(pruned);
        Ok(id)
    }

    /// Inserts the entry point of an empty graph.
    pub(crate) fn commit_first(&mut self, code: &[C::Element], label: Label) -> Result<usize, IndexError> {
        self.ensure_capacity()?;
        Ok(self.graph.push(code, label, Vec::new()))
    }

    fn ensure_capacity(&self) -> Result<(), IndexError> {
        if self.graph.len() >= self.capacity {
            return Err(IndexError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Shrinks `node`'s adjacency to the neighbours the diversity heuristic
    /// admits, at most `M`, mirroring every dropped edge. Returns the number
    /// of dropped edges.
    fn prune(&mut self, node: usize) -> usize {
        let graph = &*self.graph;
        let base = graph.code(node);
        let candidates: Vec<Neighbour> = graph
            .neighbours(node)
            .iter()
            .map(|&id| Neighbour {
                id,
                distance: self.codec.code_distance(base, graph.code(id)),
            })
            .collect();
        let (kept, dropped) = prune_diverse(candidates, self.max_edges, |a, b| {
            self.codec.code_distance(graph.code(a), graph.code(b))
        });
        if let Some(list) = self.graph.neighbours_mut(node) {
            *list = kept;
        }
        for &far in &dropped {
            self.graph.unlink(far, node);
        }
        trace!(node, dropped = dropped.len(), "pruned overflowing neighbour");
        dropped.len()
    }
}
