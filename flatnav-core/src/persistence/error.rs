//! Errors raised while saving or loading an index.

use std::io;

use thiserror::Error;

use crate::{
    distance::DistanceError,
    error::{ErrorKind, define_error_codes},
    quantization::{QuantizationMode, QuantizerError},
};

/// Errors produced by index persistence.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// The underlying reader or writer failed.
    #[error("index i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The stream ended before the index was complete.
    #[error("index data is truncated")]
    Truncated,
    /// The stream does not start with the index magic bytes.
    #[error("not a flatnav index (magic {found:02x?})")]
    BadMagic {
        /// Bytes found where the magic was expected.
        found: [u8; 4],
    },
    /// The format version is not understood by this build.
    #[error("unsupported index format version {version}")]
    UnsupportedVersion {
        /// Version read from the header.
        version: u32,
    },
    /// The trailing checksum does not match the content.
    #[error("index checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the trailer.
        stored: u32,
        /// Checksum of the bytes actually read.
        computed: u32,
    },
    /// Header or body fields contradict each other.
    #[error("inconsistent index data: {reason}")]
    Inconsistent {
        /// Human-readable explanation.
        reason: String,
    },
    /// The file was written with a different codec than the one requested.
    #[error("index stores {found} codes but {expected} was requested")]
    ModeMismatch {
        /// Mode of the requested codec type.
        expected: QuantizationMode,
        /// Mode recorded in the file.
        found: QuantizationMode,
    },
    /// Metric identifier or parameters could not be restored.
    #[error(transparent)]
    Distance(#[from] DistanceError),
    /// Quantizer identifier or parameters could not be restored.
    #[error(transparent)]
    Quantizer(#[from] QuantizerError),
}

define_error_codes! {
    /// Stable codes describing [`PersistenceError`] variants.
    enum PersistenceErrorCode for PersistenceError {
        /// Reader or writer failure.
        Io => Io(_) => "PERSISTENCE_IO",
        /// Stream ended early.
        Truncated => Truncated => "PERSISTENCE_TRUNCATED",
        /// Magic bytes missing.
        BadMagic => BadMagic { .. } => "PERSISTENCE_BAD_MAGIC",
        /// Unknown format version.
        UnsupportedVersion => UnsupportedVersion { .. } => "PERSISTENCE_UNSUPPORTED_VERSION",
        /// Checksum mismatch.
        ChecksumMismatch => ChecksumMismatch { .. } => "PERSISTENCE_CHECKSUM_MISMATCH",
        /// Contradictory fields.
        Inconsistent => Inconsistent { .. } => "PERSISTENCE_INCONSISTENT",
        /// Codec type mismatch.
        ModeMismatch => ModeMismatch { .. } => "PERSISTENCE_MODE_MISMATCH",
        /// Metric restore failure.
        Distance => Distance(_) => "PERSISTENCE_DISTANCE",
        /// Quantizer restore failure.
        Quantizer => Quantizer(_) => "PERSISTENCE_QUANTIZER",
    }
}

impl PersistenceError {
    /// Classifies the error within the shared taxonomy.
    ///
    /// Parameters that fail validation on load indicate a damaged file, so
    /// only unrecognised identifiers keep their unsupported-configuration
    /// kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::ModeMismatch { .. } => ErrorKind::UnsupportedConfiguration,
            Self::Distance(err) if err.kind() == ErrorKind::UnsupportedConfiguration => {
                ErrorKind::UnsupportedConfiguration
            }
            Self::Quantizer(err) if err.kind() == ErrorKind::UnsupportedConfiguration => {
                ErrorKind::UnsupportedConfiguration
            }
            _ => ErrorKind::CorruptData,
        }
    }

    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            reason: reason.into(),
        }
    }

    /// Maps end-of-file to [`PersistenceError::Truncated`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(err)
        }
    }
}
