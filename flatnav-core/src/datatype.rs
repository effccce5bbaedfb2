//! Element type descriptors for on-disk vector data.
//!
//! Datasets arrive in a range of element encodings. Only `float32` can be
//! indexed directly; the descriptor lets ingestion code reject the others with
//! a precise message instead of misreading bytes.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::error::{ErrorKind, define_error_codes};

/// Element encodings recognised by dataset readers.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DataType {
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE 754 half precision.
    Float16,
    /// IEEE 754 single precision.
    #[default]
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

/// Raised when a data type name is not recognised or cannot be indexed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum DataTypeError {
    /// The name did not match any known encoding.
    #[error("unknown data type `{name}`")]
    Unknown {
        /// The rejected name.
        name: String,
    },
    /// The encoding is known but vectors of this type cannot be indexed.
    #[error("data type `{data_type}` is not supported for indexing (expected float32)")]
    Unsupported {
        /// The rejected encoding.
        data_type: DataType,
    },
}

define_error_codes! {
    /// Stable codes describing [`DataTypeError`] variants.
    enum DataTypeErrorCode for DataTypeError {
        /// The name did not match any known encoding.
        Unknown => Unknown { .. } => "DATA_TYPE_UNKNOWN",
        /// The encoding cannot be indexed.
        Unsupported => Unsupported { .. } => "DATA_TYPE_UNSUPPORTED",
    }
}

impl DataTypeError {
    /// Both variants describe configuration the core cannot honour.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::UnsupportedConfiguration
    }
}

impl DataType {
    /// Every known encoding, narrowest integers first.
    pub const ALL: [Self; 11] = [
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Width of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Confirms the encoding can be fed to an index.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] for anything but `float32`.
    pub fn ensure_indexable(self) -> Result<(), DataTypeError> {
        match self {
            Self::Float32 => Ok(()),
            other => Err(DataTypeError::Unsupported { data_type: other }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = DataTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.name() == wanted)
            .ok_or_else(|| DataTypeError::Unknown {
                name: value.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DataType::Uint8, 1)]
    #[case(DataType::Float16, 2)]
    #[case(DataType::Int32, 4)]
    #[case(DataType::Float32, 4)]
    #[case(DataType::Float64, 8)]
    fn reports_element_width(#[case] data_type: DataType, #[case] expected: usize) {
        assert_eq!(data_type.size(), expected);
    }

    #[test]
    fn names_round_trip_through_parsing() {
        for data_type in DataType::ALL {
            let parsed: DataType = data_type.name().parse().expect("canonical name");
            assert_eq!(parsed, data_type);
        }
    }

    #[test]
    fn only_float32_is_indexable() {
        assert!(DataType::Float32.ensure_indexable().is_ok());
        let err = DataType::Uint8
            .ensure_indexable()
            .expect_err("uint8 must be rejected");
        assert_eq!(err.code(), DataTypeErrorCode::Unsupported);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "bfloat16".parse::<DataType>().expect_err("unknown type");
        assert_eq!(err.code().as_str(), "DATA_TYPE_UNKNOWN");
    }
}
