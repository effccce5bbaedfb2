//! Errors raised while configuring, training, or applying a quantizer.

use thiserror::Error;

use crate::error::{ErrorKind, define_error_codes};

/// Errors produced by the quantization layer.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum QuantizerError {
    /// Vectors must have at least one component.
    #[error("quantizer dimension must be greater than zero")]
    ZeroDimension,
    /// Subspace count must lie in `1..=dimension`.
    #[error("subspace count {subspaces} must be between 1 and the dimension {dimension}")]
    InvalidSubspaces {
        /// Requested subspace count.
        subspaces: usize,
        /// Vector dimensionality.
        dimension: usize,
    },
    /// Code width must lie in `1..=8` bits.
    #[error("bits per code must be between 1 and 8 (got {bits})")]
    InvalidBits {
        /// Requested width.
        bits: u8,
    },
    /// K-means needs at least one iteration.
    #[error("k-means iteration count must be greater than zero")]
    ZeroIterations,
    /// Fewer training samples than parameters to fit.
    #[error("training requires at least {required} samples but {provided} were given")]
    InsufficientSamples {
        /// Minimum number of samples.
        required: usize,
        /// Samples supplied by the caller.
        provided: usize,
    },
    /// The sample buffer is shorter than `count * dimension`.
    #[error("sample buffer holds {actual} values but {expected} are required")]
    SampleBufferTooShort {
        /// Values required for the declared sample count.
        expected: usize,
        /// Values actually supplied.
        actual: usize,
    },
    /// A vector had the wrong number of components.
    #[error("vector has {actual} components but the quantizer expects {expected}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Supplied dimensionality.
        actual: usize,
    },
    /// A code had the wrong number of elements.
    #[error("code has {actual} elements but the quantizer expects {expected}")]
    CodeLengthMismatch {
        /// Configured code length.
        expected: usize,
        /// Supplied code length.
        actual: usize,
    },
    /// A training sample or vector contained NaN or infinity.
    #[error("value at position {position} is not finite")]
    NonFinite {
        /// Flat position of the offending value.
        position: usize,
    },
    /// A code referenced a level or centroid outside the trained range.
    #[error("code element {position} holds {value}, above the maximum {max}")]
    CodeOutOfRange {
        /// Position within the code.
        position: usize,
        /// Offending value.
        value: u8,
        /// Largest permitted value.
        max: u8,
    },
    /// A quantization mode name or identifier was not recognised.
    #[error("unknown quantization mode `{name}`")]
    UnknownMode {
        /// Rejected name or identifier.
        name: String,
    },
    /// A scale granularity identifier was not recognised.
    #[error("unknown scale granularity identifier {id}")]
    UnknownGranularity {
        /// Rejected identifier.
        id: u8,
    },
}

define_error_codes! {
    /// Stable codes describing [`QuantizerError`] variants.
    enum QuantizerErrorCode for QuantizerError {
        /// Vectors must have at least one component.
        ZeroDimension => ZeroDimension => "QUANTIZER_ZERO_DIMENSION",
        /// Subspace count out of range.
        InvalidSubspaces => InvalidSubspaces { .. } => "QUANTIZER_INVALID_SUBSPACES",
        /// Code width out of range.
        InvalidBits => InvalidBits { .. } => "QUANTIZER_INVALID_BITS",
        /// K-means needs at least one iteration.
        ZeroIterations => ZeroIterations => "QUANTIZER_ZERO_ITERATIONS",
        /// Too few training samples.
        InsufficientSamples => InsufficientSamples { .. } => "QUANTIZER_INSUFFICIENT_SAMPLES",
        /// Sample buffer shorter than declared.
        SampleBufferTooShort => SampleBufferTooShort { .. } => "QUANTIZER_SAMPLE_BUFFER_TOO_SHORT",
        /// Vector dimensionality mismatch.
        DimensionMismatch => DimensionMismatch { .. } => "QUANTIZER_DIMENSION_MISMATCH",
        /// Code length mismatch.
        CodeLengthMismatch => CodeLengthMismatch { .. } => "QUANTIZER_CODE_LENGTH_MISMATCH",
        /// Non-finite input value.
        NonFinite => NonFinite { .. } => "QUANTIZER_NON_FINITE",
        /// Code element outside the trained range.
        CodeOutOfRange => CodeOutOfRange { .. } => "QUANTIZER_CODE_OUT_OF_RANGE",
        /// Unknown quantization mode.
        UnknownMode => UnknownMode { .. } => "QUANTIZER_UNKNOWN_MODE",
        /// Unknown scale granularity.
        UnknownGranularity => UnknownGranularity { .. } => "QUANTIZER_UNKNOWN_GRANULARITY",
    }
}

impl QuantizerError {
    /// Classifies the error within the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMode { .. } | Self::UnknownGranularity { .. } => {
                ErrorKind::UnsupportedConfiguration
            }
            _ => ErrorKind::InvalidArgument,
        }
    }
}
