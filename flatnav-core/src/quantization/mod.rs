//! Vector compression for compact storage and cheap approximate distances.
//!
//! Both quantizers follow a two-phase lifecycle: a validated configuration
//! ([`ProductQuantizerConfig`], [`LowPrecisionConfig`]) is trained once on a
//! sample and yields an immutable trained quantizer. Only trained quantizers
//! implement [`crate::VectorCodec`], so encoding before training does not
//! compile.

mod error;
mod kmeans;
mod low_precision;
mod product;

use std::{fmt, str::FromStr};

pub use self::{
    error::{QuantizerError, QuantizerErrorCode},
    low_precision::{LowPrecisionConfig, LowPrecisionQuantizer, LowPrecisionQuery, ScaleGranularity},
    product::{ProductQuantizer, ProductQuantizerConfig, ProductQuery},
};

/// How an index stores its vectors.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QuantizationMode {
    /// Raw `f32` vectors with exact distances.
    #[default]
    None,
    /// Product quantization codes.
    Product,
    /// Low-precision scalar codes.
    LowPrecision,
}

impl QuantizationMode {
    /// Returns a stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Product => "product",
            Self::LowPrecision => "low_precision",
        }
    }

    /// Identifier written to persisted indexes.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Product => 1,
            Self::LowPrecision => 2,
        }
    }

    /// Resolves a persisted identifier.
    ///
    /// # Errors
    /// Returns [`QuantizerError::UnknownMode`] for unrecognised identifiers.
    pub fn from_id(id: u8) -> Result<Self, QuantizerError> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Product),
            2 => Ok(Self::LowPrecision),
            other => Err(QuantizerError::UnknownMode {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for QuantizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantizationMode {
    type Err = QuantizerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "flat" => Ok(Self::None),
            "pq" | "product" => Ok(Self::Product),
            "lpq" | "low_precision" => Ok(Self::LowPrecision),
            _ => Err(QuantizerError::UnknownMode {
                name: value.to_owned(),
            }),
        }
    }
}

/// Checks that `vectors` holds `count` finite vectors of `dimension` values.
pub(crate) fn validate_samples(
    vectors: &[f32],
    count: usize,
    dimension: usize,
) -> Result<(), QuantizerError> {
    let expected = count
        .checked_mul(dimension)
        .ok_or(QuantizerError::SampleBufferTooShort {
            expected: usize::MAX,
            actual: vectors.len(),
        })?;
    let Some(samples) = vectors.get(..expected) else {
        return Err(QuantizerError::SampleBufferTooShort {
            expected,
            actual: vectors.len(),
        });
    };
    ensure_finite(samples)
}

/// Checks that a single vector matches `dimension` and is finite.
pub(crate) fn validate_vector(vector: &[f32], dimension: usize) -> Result<(), QuantizerError> {
    if vector.len() != dimension {
        return Err(QuantizerError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    ensure_finite(vector)
}

pub(crate) fn validate_bits(bits: u8) -> Result<(), QuantizerError> {
    if (1..=8).contains(&bits) {
        Ok(())
    } else {
        Err(QuantizerError::InvalidBits { bits })
    }
}

fn ensure_finite(values: &[f32]) -> Result<(), QuantizerError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(position) => Err(QuantizerError::NonFinite { position }),
        None => Ok(()),
    }
}
