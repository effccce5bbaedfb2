use arrow_schema::{ArrowError, DataType};
use thiserror::Error;

/// Errors raised while loading a dense dataset.
#[derive(Debug, Error)]
pub enum DenseMatrixError {
    #[error("column `{column}` not found in Parquet schema")]
    ColumnNotFound { column: String },
    #[error("column `{column}` must be a FixedSizeList<Float32, _> but found {actual:?}")]
    InvalidColumnType { column: String, actual: DataType },
    #[error("column `{column}` must not be nullable (child nullable: {nullable_child})")]
    NullableField {
        column: String,
        nullable_child: bool,
    },
    #[error("FixedSizeList child type must be Float32 but found {actual:?}")]
    InvalidListValueType { actual: DataType },
    #[error("invalid FixedSizeList dimension {actual}")]
    InvalidDimension { actual: i32 },
    #[error("row {row} is null")]
    NullRow { row: usize },
    #[error("row {row} contains null value at position {value_index}")]
    NullValue { row: usize, value_index: usize },
    #[error("row {row} has length {actual} but expected {expected}")]
    InvalidRowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("matrix with {rows} rows and dimension {dimension} exceeds capacity limits")]
    CapacityOverflow { rows: usize, dimension: usize },
    #[error("inconsistent dimensions across batches: expected {expected}, got {actual}")]
    InconsistentBatchDimension { expected: usize, actual: usize },
    #[error("vectors must have at least one component")]
    ZeroDimension,
    #[error("{len} values cannot be split into rows of dimension {dimension}")]
    RaggedValues { len: usize, dimension: usize },
    #[error("record {row} declares invalid dimension {declared}")]
    InvalidRecordHeader { row: usize, declared: i32 },
    #[error("record {row} ends before its {expected} components")]
    TruncatedRecord { row: usize, expected: usize },
    #[error("ground-truth row {row} holds negative id {value} at position {position}")]
    NegativeId {
        row: usize,
        position: usize,
        value: i32,
    },
    #[error("not an .npy file")]
    NpyMagic,
    #[error("unsupported .npy version {major}.{minor}")]
    NpyVersion { major: u8, minor: u8 },
    #[error("malformed .npy header: {reason}")]
    NpyHeader { reason: String },
    #[error(".npy dtype `{descr}` is not little-endian float32")]
    NpyDtype { descr: String },
    #[error("Fortran-ordered .npy arrays are not supported")]
    NpyFortranOrder,
    #[error(".npy array has shape {shape:?} but a 2-D array is required")]
    NpyShape { shape: Vec<usize> },
    #[error("cannot infer data format from `{path}`")]
    UnknownFormat { path: String },
    #[error("a column name is required for Parquet input")]
    MissingColumn,
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
