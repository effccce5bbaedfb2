//! Flat adjacency storage for the single-layer proximity graph.
//!
//! Node `i` is the `i`-th successful insertion. Codes live in one contiguous
//! buffer of `len * code_len` elements, labels and adjacency lists are
//! indexed by node id. Node `0` is the entry point once the graph is
//! non-empty.

use crate::codec::CodeElement;

use super::types::Label;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Graph<E> {
    code_len: usize,
    codes: Vec<E>,
    labels: Vec<Label>,
    adjacency: Vec<Vec<usize>>,
}

impl<E: CodeElement> Graph<E> {
    pub(crate) fn with_capacity(code_len: usize, capacity: usize) -> Self {
        Self {
            code_len,
            codes: Vec::with_capacity(code_len.saturating_mul(capacity)),
            labels: Vec::with_capacity(capacity),
            adjacency: Vec::with_capacity(capacity),
        }
    }

    /// Rebuilds a graph from persisted parts. The caller has validated that
    /// the parts agree in length and that every neighbour id is in range.
    pub(crate) fn from_parts(
        code_len: usize,
        codes: Vec<E>,
        labels: Vec<Label>,
        adjacency: Vec<Vec<usize>>,
    ) -> Self {
        debug_assert_eq!(codes.len(), labels.len() * code_len);
        debug_assert_eq!(labels.len(), adjacency.len());
        Self {
            code_len,
            codes,
            labels,
            adjacency,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub(crate) fn entry(&self) -> Option<usize> {
        (!self.is_empty()).then_some(0)
    }

    pub(crate) fn code_len(&self) -> usize {
        self.code_len
    }

    #[inline]
    pub(crate) fn code(&self, id: usize) -> &[E] {
        let start = id * self.code_len;
        self.codes.get(start..start + self.code_len).unwrap_or(&[])
    }

    pub(crate) fn codes(&self) -> &[E] {
        &self.codes
    }

    pub(crate) fn label(&self, id: usize) -> Option<Label> {
        self.labels.get(id).copied()
    }

    pub(crate) fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[inline]
    pub(crate) fn neighbours(&self, id: usize) -> &[usize] {
        self.adjacency.get(id).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn neighbours_mut(&mut self, id: usize) -> Option<&mut Vec<usize>> {
        self.adjacency.get_mut(id)
    }

    #[inline]
    pub(crate) fn degree(&self, id: usize) -> usize {
        self.neighbours(id).len()
    }

    /// Appends a node and returns its id. Edges are one-way until the caller
    /// links the back-edges.
    pub(crate) fn push(&mut self, code: &[E], label: Label, neighbours: Vec<usize>) -> usize {
        debug_assert_eq!(code.len(), self.code_len);
        let id = self.labels.len();
        self.codes.extend_from_slice(code);
        self.labels.push(label);
        self.adjacency.push(neighbours);
        id
    }

    /// Removes the edge `from -> to` if present.
    pub(crate) fn unlink(&mut self, from: usize, to: usize) {
        if let Some(list) = self.adjacency.get_mut(from) {
            list.retain(|&id| id != to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_sequential_ids_and_stores_codes() {
        let mut graph: Graph<f32> = Graph::with_capacity(2, 3);
        assert_eq!(graph.entry(), None);
        assert_eq!(graph.push(&[1.0, 2.0], 10, vec![]), 0);
        assert_eq!(graph.push(&[3.0, 4.0], 11, vec![0]), 1);
        assert_eq!(graph.entry(), Some(0));
        assert_eq!(graph.code(1), &[3.0, 4.0]);
        assert_eq!(graph.label(1), Some(11));
        assert_eq!(graph.neighbours(1), &[0]);
        assert!(graph.code(7).is_empty());
    }

    #[test]
    fn unlink_removes_one_direction_only() {
        let mut graph: Graph<u8> = Graph::with_capacity(1, 2);
        graph.push(&[0], 0, vec![1]);
        graph.push(&[1], 1, vec![0]);
        graph.unlink(0, 1);
        assert!(graph.neighbours(0).is_empty());
        assert_eq!(graph.neighbours(1), &[0]);
    }
}
