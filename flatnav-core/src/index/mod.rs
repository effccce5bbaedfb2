//! Single-layer navigable proximity graph.
//!
//! [`Index`] owns codes, labels, adjacency lists and the entry point behind a
//! single [`RwLock`]. Insertion plans under the shared lock and commits under
//! the exclusive lock, so concurrent insertions search in parallel and
//! serialize only their mutations. Searches take the shared lock and
//! therefore never observe a half-applied insertion.
//!
//! With more than one worker, [`Index::insert_batch`] inserts rows in no
//! particular order. The resulting topology, and with it recall and latency,
//! varies from run to run.

mod error;
mod graph;
mod insert;
mod invariants;
mod params;
mod search;
mod select;
mod telemetry;
mod types;
mod visited;


use std::{
    sync::{OnceLock, RwLock, RwLockReadGuard},
    time::Instant,
};

use tracing::{debug, info, instrument};

use crate::{codec::VectorCodec, distance::Metric, parallel::try_execute_in_parallel};

pub(crate) use self::graph::Graph;
pub use self::{
    error::{IndexError, IndexErrorCode},
    invariants::{Invariant, InvariantChecker, InvariantViolation},
    params::IndexParams,
    types::{Label, Neighbour, SearchHit},
};
use self::{
    insert::{InsertionCommitter, InsertionPlanner},
    search::beam_search,
};

/// Approximate nearest-neighbour index over a codec `C`.
///
/// # Examples
/// ```
/// use flatnav_core::{FlatCodec, Index, IndexParams, Metric};
///
/// let codec = FlatCodec::new(Metric::Euclidean, 2).expect("codec");
/// let index = Index::new(codec, IndexParams::new(2, 4).expect("params"));
/// for (label, point) in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]]
///     .iter()
///     .enumerate()
/// {
///     index.insert(point, label as u64, 4).expect("insert");
/// }
/// let hits = index.search(&[0.0, 0.1], 1, 4).expect("search");
/// assert_eq!(hits[0].label, 0);
/// ```
#[derive(Debug)]
pub struct Index<C: VectorCodec> {
    codec: C,
    params: IndexParams,
    graph: RwLock<Graph<C::Element>>,
}

impl<C: VectorCodec> Index<C> {
    /// Creates an empty index that stores vectors through `codec`.
    #[must_use]
    pub fn new(codec: C, params: IndexParams) -> Self {
        let graph = Graph::with_capacity(codec.code_len(), params.capacity());
        Self::from_parts(codec, params, graph)
    }

    pub(crate) fn from_parts(codec: C, params: IndexParams, graph: Graph<C::Element>) -> Self {
        Self {
            codec,
            params,
            graph: RwLock::new(graph),
        }
    }

    /// The codec storing this index's vectors.
    #[must_use]
    #[rustfmt::skip]
    pub fn codec(&self) -> &C { &self.codec }

    /// Structural parameters fixed at construction.
    #[must_use]
    #[rustfmt::skip]
    pub fn params(&self) -> IndexParams { self.params }

    /// Metric the index ranks by.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.codec.metric()
    }

    /// Dimensionality of accepted vectors.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.codec.dimension()
    }

    /// Number of inserted nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_graph(|graph| graph.len())
    }

    /// Whether the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label stored with internal node `id`.
    #[must_use]
    pub fn label(&self, id: usize) -> Option<Label> {
        self.read_graph(|graph| graph.label(id))
    }

    /// Adjacency list of internal node `id`. Empty for unknown ids.
    #[must_use]
    pub fn neighbours(&self, id: usize) -> Vec<usize> {
        self.read_graph(|graph| graph.neighbours(id).to_vec())
    }

    /// Raw code stored for node `id`, exactly as the codec produced it.
    #[must_use]
    pub fn stored_code(&self, id: usize) -> Option<Vec<C::Element>> {
        self.read_graph(|graph| (id < graph.len()).then(|| graph.code(id).to_vec()))
    }

    /// Decodes the stored vector of node `id`. Lossy under quantization.
    #[must_use]
    pub fn reconstruct(&self, id: usize) -> Option<Vec<f32>> {
        self.read_graph(|graph| {
            (id < graph.len()).then(|| {
                let mut vector = vec![0.0; self.codec.dimension()];
                self.codec.decode_into(graph.code(id), &mut vector);
                vector
            })
        })
    }

    /// Inserts `vector` under `label` and returns its internal node id.
    ///
    /// # Errors
    /// - [`IndexError::DimensionMismatch`] or
    ///   [`IndexError::NonFiniteComponent`] for invalid vectors.
    /// - [`IndexError::ZeroEfConstruction`] when `ef_construction` is zero.
    /// - [`IndexError::CapacityExhausted`] once the index is full.
    ///
    /// The node count is unchanged whenever an error is returned.
    pub fn insert(
        &self,
        vector: &[f32],
        label: Label,
        ef_construction: usize,
    ) -> Result<usize, IndexError> {
        self.validate_vector(vector)?;
        if ef_construction == 0 {
            return Err(IndexError::ZeroEfConstruction);
        }
        let mut code = vec![C::Element::default(); self.codec.code_len()];
        self.codec.encode_into(vector, &mut code);

        if let Some(id) = self.try_insert_first(&code, label)? {
            telemetry::record_insertion();
            return Ok(id);
        }

        let plan = self.read_graph(|graph| {
            InsertionPlanner {
                codec: &self.codec,
                graph,
                max_edges: self.params.max_edges(),
            }
            .plan(vector, &code, ef_construction)
        });
        let id = self.write_graph(|graph| {
            InsertionCommitter {
                codec: &self.codec,
                graph,
                max_edges: self.params.max_edges(),
                capacity: self.params.capacity(),
            }
            .commit(&code, label, plan)
        })?;
        telemetry::record_insertion();
        Ok(id)
    }

    /// Inserts every row of the row-major `vectors` buffer with the matching
    /// label, fanning out across `num_threads` workers.
    ///
    /// Every row is attempted even after a failure; the first error is
    /// returned afterwards.
    ///
    /// # Errors
    /// Returns [`IndexError::RaggedBatch`] or
    /// [`IndexError::BatchLengthMismatch`] for malformed batches, executor
    /// errors, or the first per-row insertion error.
    #[instrument(
        name = "index.insert_batch",
        err,
        skip(self, vectors, labels),
        fields(rows = labels.len(), mode = %self.codec.mode())
    )]
    pub fn insert_batch(
        &self,
        vectors: &[f32],
        labels: &[Label],
        ef_construction: usize,
        num_threads: usize,
    ) -> Result<(), IndexError> {
        let rows = self.split_rows(vectors)?;
        if rows.len() != labels.len() {
            return Err(IndexError::BatchLengthMismatch {
                vectors: rows.len(),
                labels: labels.len(),
            });
        }
        let started = Instant::now();
        try_execute_in_parallel(0, rows.len(), num_threads, |i| {
            match (rows.get(i), labels.get(i)) {
                (Some(row), Some(&label)) => self.insert(row, label, ef_construction).map(|_| ()),
                _ => Ok(()),
            }
        })?;
        info!(
            nodes = self.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch insertion finished"
        );
        Ok(())
    }

    /// Returns up to `top_k` hits closest to `query`, ascending by distance.
    ///
    /// An empty index yields an empty result.
    ///
    /// # Errors
    /// - [`IndexError::ZeroTopK`] or [`IndexError::EfBelowTopK`] for invalid
    ///   beam parameters.
    /// - [`IndexError::DimensionMismatch`] or
    ///   [`IndexError::NonFiniteComponent`] for invalid queries.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::ZeroTopK);
        }
        if ef_search < top_k {
            return Err(IndexError::EfBelowTopK { ef_search, top_k });
        }
        self.validate_vector(query)?;

        let started = Instant::now();
        let prepared = self.codec.prepare_query(query);
        let hits = self.read_graph(|graph| {
            beam_search(graph, ef_search, |code| {
                self.codec.query_distance(&prepared, code)
            })
            .into_iter()
            .take(top_k)
            .filter_map(|hit| {
                graph.label(hit.id).map(|label| SearchHit {
                    label,
                    distance: hit.distance,
                })
            })
            .collect()
        });
        telemetry::record_search(started.elapsed());
        Ok(hits)
    }

    /// Answers every row of the row-major `queries` buffer on `num_threads`
    /// workers. Results are returned in query order.
    ///
    /// # Errors
    /// As [`Index::search`], plus [`IndexError::RaggedBatch`] and executor
    /// errors.
    #[instrument(name = "index.search_batch", err, skip(self, queries))]
    pub fn search_batch(
        &self,
        queries: &[f32],
        top_k: usize,
        ef_search: usize,
        num_threads: usize,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError> {
        let rows = self.split_rows(queries)?;
        let slots: Vec<OnceLock<Vec<SearchHit>>> = rows.iter().map(|_| OnceLock::new()).collect();
        try_execute_in_parallel(0, rows.len(), num_threads, |i| {
            let (Some(row), Some(slot)) = (rows.get(i), slots.get(i)) else {
                return Ok(());
            };
            let hits = self.search(row, top_k, ef_search)?;
            // Each index is claimed by exactly one worker.
            let _ = slot.set(hits);
            Ok::<(), IndexError>(())
        })?;
        debug!(queries = rows.len(), "batch search finished");
        Ok(slots
            .into_iter()
            .map(|slot| slot.into_inner().unwrap_or_default())
            .collect())
    }

    /// Returns a handle for checking structural invariants.
    #[must_use]
    pub fn invariants(&self) -> InvariantChecker<'_, C> {
        InvariantChecker::new(self)
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<(), IndexError> {
        let expected = self.codec.dimension();
        if vector.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        match vector.iter().position(|value| !value.is_finite()) {
            Some(position) => Err(IndexError::NonFiniteComponent { position }),
            None => Ok(()),
        }
    }

    fn split_rows<'v>(&self, buffer: &'v [f32]) -> Result<Vec<&'v [f32]>, IndexError> {
        let dimension = self.codec.dimension();
        if buffer.len() % dimension != 0 {
            return Err(IndexError::RaggedBatch {
                len: buffer.len(),
                dimension,
            });
        }
        Ok(buffer.chunks_exact(dimension).collect())
    }

    /// Inserts the entry point when the graph is empty. Returns `None` when
    /// another node got there first.
    fn try_insert_first(&self, code: &[C::Element], label: Label) -> Result<Option<usize>, IndexError> {
        if !self.read_graph(Graph::is_empty) {
            return Ok(None);
        }
        self.write_graph(|graph| {
            if !graph.is_empty() {
                return Ok(None);
            }
            InsertionCommitter {
                codec: &self.codec,
                graph,
                max_edges: self.params.max_edges(),
                capacity: self.params.capacity(),
            }
            .commit_first(code, label)
            .map(Some)
        })
    }

    pub(crate) fn read_graph<R>(&self, f: impl FnOnce(&Graph<C::Element>) -> R) -> R {
        let guard = self.graph_guard();
        f(&guard)
    }

    pub(crate) fn graph_guard(&self) -> RwLockReadGuard<'_, Graph<C::Element>> {
        self.graph.read().expect("graph lock poisoned")
    }

    fn write_graph<R>(&self, f: impl FnOnce(&mut Graph<C::Element>) -> R) -> R {
        let mut guard = self.graph.write().expect("graph lock poisoned");
        f(&mut guard)
    }
}
