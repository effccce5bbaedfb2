//! Domain primitives shared by the distance routines.

use thiserror::Error;

use crate::error::{ErrorKind, define_error_codes};

/// Errors emitted while computing distances or resolving metrics.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum DistanceError {
    /// A codec was asked to store zero-dimensional vectors.
    #[error("vectors must have positive dimension")]
    ZeroLength,
    /// A metric name was not recognised.
    #[error("unknown metric `{name}` (expected `l2` or `ip`)")]
    UnknownMetric {
        /// The rejected name.
        name: String,
    },
    /// A persisted metric identifier was not recognised.
    #[error("unknown metric identifier {id}")]
    UnknownMetricId {
        /// The rejected identifier.
        id: u8,
    },
}

define_error_codes! {
    /// Stable codes describing [`DistanceError`] variants.
    enum DistanceErrorCode for DistanceError {
        /// Zero-dimensional vectors were requested.
        ZeroLength => ZeroLength => "DISTANCE_ZERO_LENGTH",
        /// A metric name was not recognised.
        UnknownMetric => UnknownMetric { .. } => "DISTANCE_UNKNOWN_METRIC",
        /// A persisted metric identifier was not recognised.
        UnknownMetricId => UnknownMetricId { .. } => "DISTANCE_UNKNOWN_METRIC_ID",
    }
}

impl DistanceError {
    /// Classifies the error within the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroLength => ErrorKind::InvalidArgument,
            Self::UnknownMetric { .. } | Self::UnknownMetricId { .. } => {
                ErrorKind::UnsupportedConfiguration
            }
        }
    }
}

/// Convenient alias for distance computations.
pub type Result<T> = core::result::Result<T, DistanceError>;
