//! Error types produced by the graph index.

use thiserror::Error;

use crate::{
    distance::DistanceError,
    error::{ErrorKind, define_error_codes},
    parallel::ParallelError,
    persistence::PersistenceError,
    quantization::QuantizerError,
};

/// Errors produced by [`crate::Index`] operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexError {
    /// Parameters were invalid for the requested index.
    #[error("invalid index parameter: {reason}")]
    InvalidParameters {
        /// Human-readable explanation.
        reason: String,
    },
    /// A vector or query had the wrong number of components.
    #[error("vector has {actual} components but the index expects {expected}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Supplied dimensionality.
        actual: usize,
    },
    /// A vector contained NaN or infinity.
    #[error("vector component {position} is not finite")]
    NonFiniteComponent {
        /// Offending component index.
        position: usize,
    },
    /// `ef_construction` must be at least one.
    #[error("ef_construction must be at least 1")]
    ZeroEfConstruction,
    /// `top_k` must be at least one.
    #[error("top_k must be at least 1")]
    ZeroTopK,
    /// The beam cannot be narrower than the number of requested results.
    #[error("ef_search ({ef_search}) must be >= top_k ({top_k})")]
    EfBelowTopK {
        /// Requested beam width.
        ef_search: usize,
        /// Requested result count.
        top_k: usize,
    },
    /// A batch supplied a different number of labels and vectors.
    #[error("batch holds {vectors} vectors but {labels} labels")]
    BatchLengthMismatch {
        /// Number of vectors in the batch.
        vectors: usize,
        /// Number of labels in the batch.
        labels: usize,
    },
    /// A row-major batch buffer is not a whole number of vectors.
    #[error("batch buffer of {len} values is not a multiple of dimension {dimension}")]
    RaggedBatch {
        /// Buffer length.
        len: usize,
        /// Index dimensionality.
        dimension: usize,
    },
    /// The index already holds `capacity` nodes.
    #[error("index is full at {capacity} nodes")]
    CapacityExhausted {
        /// Configured capacity.
        capacity: usize,
    },
    /// Wrapped metric error.
    #[error(transparent)]
    Distance(#[from] DistanceError),
    /// Wrapped quantizer error.
    #[error(transparent)]
    Quantizer(#[from] QuantizerError),
    /// Wrapped executor error.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
    /// Wrapped persistence error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

define_error_codes! {
    /// Stable codes describing [`IndexError`] variants.
    enum IndexErrorCode for IndexError {
        /// Invalid construction parameters.
        InvalidParameters => InvalidParameters { .. } => "INDEX_INVALID_PARAMETERS",
        /// Vector dimensionality mismatch.
        DimensionMismatch => DimensionMismatch { .. } => "INDEX_DIMENSION_MISMATCH",
        /// Non-finite vector component.
        NonFiniteComponent => NonFiniteComponent { .. } => "INDEX_NON_FINITE_COMPONENT",
        /// `ef_construction` of zero.
        ZeroEfConstruction => ZeroEfConstruction => "INDEX_ZERO_EF_CONSTRUCTION",
        /// `top_k` of zero.
        ZeroTopK => ZeroTopK => "INDEX_ZERO_TOP_K",
        /// `ef_search` below `top_k`.
        EfBelowTopK => EfBelowTopK { .. } => "INDEX_EF_BELOW_TOP_K",
        /// Batch vectors and labels differ in length.
        BatchLengthMismatch => BatchLengthMismatch { .. } => "INDEX_BATCH_LENGTH_MISMATCH",
        /// Batch buffer is ragged.
        RaggedBatch => RaggedBatch { .. } => "INDEX_RAGGED_BATCH",
        /// Capacity reached.
        CapacityExhausted => CapacityExhausted { .. } => "INDEX_CAPACITY_EXHAUSTED",
        /// Metric failure.
        Distance => Distance(_) => "INDEX_DISTANCE",
        /// Quantizer failure.
        Quantizer => Quantizer(_) => "INDEX_QUANTIZER",
        /// Executor failure.
        Parallel => Parallel(_) => "INDEX_PARALLEL",
        /// Persistence failure.
        Persistence => Persistence(_) => "INDEX_PERSISTENCE",
    }
}

impl IndexError {
    /// Classifies the error within the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapacityExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Distance(err) => err.kind(),
            Self::Quantizer(err) => err.kind(),
            Self::Parallel(err) => err.kind(),
            Self::Persistence(err) => err.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }
}
