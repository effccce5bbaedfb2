//! Benchmark setup error type.
//!
//! Lets setup code propagate core failures with `?` instead of panicking
//! inside Criterion closures.

use flatnav_core::{DistanceError, IndexError, QuantizerError};

use crate::source::SyntheticError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic source generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Index parameters, insertion, or search failed.
    #[error("index operation failed: {0}")]
    Index(#[from] IndexError),
    /// Quantizer configuration or training failed.
    #[error("quantizer operation failed: {0}")]
    Quantizer(#[from] QuantizerError),
    /// Codec construction failed.
    #[error("codec construction failed: {0}")]
    Distance(#[from] DistanceError),
    /// Writing the recall report failed.
    #[error("failed to write recall report: {0}")]
    RecallReport(#[source] std::io::Error),
}
