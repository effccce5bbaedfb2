//! Row-major dense matrix and its Arrow and Parquet constructors.
use std::{fs::File, io::BufReader, path::Path};

use arrow_array::{Array, FixedSizeListArray, RecordBatchReader};
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::reader::ChunkReader;
use tracing::{debug, instrument};

use crate::errors::DenseMatrixError;
use crate::format::DataFormat;
use crate::ingest::{append_fixed_size_list_values, validate_fixed_size_list_field};
use crate::{npy, vecs};

/// Dense `f32` dataset held in one contiguous row-major buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    name: String,
    rows: usize,
    dimension: usize,
    values: Vec<f32>,
}

impl DenseMatrix {
    /// Wraps `values` as rows of `dimension` components.
    ///
    /// # Errors
    /// Returns [`DenseMatrixError::ZeroDimension`] when `dimension` is zero
    /// and [`DenseMatrixError::RaggedValues`] when `values` does not split
    /// evenly into rows.
    ///
    /// # Examples
    /// ```
    /// use flatnav_providers_dense::DenseMatrix;
    ///
    /// let matrix = DenseMatrix::try_new("demo", 2, vec![0.0, 1.0, 2.0, 3.0]).expect("matrix");
    /// assert_eq!(matrix.rows(), 2);
    /// assert_eq!(matrix.row(1), Some(&[2.0, 3.0][..]));
    /// ```
    pub fn try_new(
        name: impl Into<String>,
        dimension: usize,
        values: Vec<f32>,
    ) -> Result<Self, DenseMatrixError> {
        if dimension == 0 {
            return Err(DenseMatrixError::ZeroDimension);
        }
        if values.len() % dimension != 0 {
            return Err(DenseMatrixError::RaggedValues {
                len: values.len(),
                dimension,
            });
        }
        Ok(Self::from_parts(name, values.len() / dimension, dimension, values))
    }

    pub(crate) fn from_parts(
        name: impl Into<String>,
        rows: usize,
        dimension: usize,
        values: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(values.len(), rows.saturating_mul(dimension));
        Self {
            name: name.into(),
            rows,
            dimension,
            values,
        }
    }

    /// Loads `path` in the given format.
    ///
    /// `column` names the Parquet column and is ignored by the other formats.
    ///
    /// # Errors
    /// Returns [`DenseMatrixError::MissingColumn`] for Parquet input without a
    /// column, and any error of the format-specific loader.
    #[instrument(name = "dense.load", err, skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(
        path: impl AsRef<Path>,
        format: DataFormat,
        column: Option<&str>,
    ) -> Result<Self, DenseMatrixError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
        let matrix = match format {
            DataFormat::Parquet => {
                let column = column.ok_or(DenseMatrixError::MissingColumn)?;
                Self::try_from_parquet_path(name, path, column)?
            }
            DataFormat::Fvecs => Self::try_from_fvecs_path(name, path)?,
            DataFormat::Npy => Self::try_from_npy_path(name, path)?,
        };
        debug!(rows = matrix.rows, dimension = matrix.dimension, "dataset loaded");
        Ok(matrix)
    }

    /// Dataset name, usually the file stem.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Components per row.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The row-major buffer.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.values
    }

    /// Row `index`, if present.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.values.get(start..start.checked_add(self.dimension)?)
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f32]> {
        self.values.chunks_exact(self.dimension)
    }

    /// Consumes the matrix, returning the row-major buffer.
    #[must_use]
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Loads data from an Arrow [`FixedSizeListArray`].
    ///
    /// # Errors
    /// Returns [`DenseMatrixError`] for non-`Float32` children, null rows or
    /// values, and zero-width lists.
    pub fn try_from_fixed_size_list(
        name: impl Into<String>,
        array: &FixedSizeListArray,
    ) -> Result<Self, DenseMatrixError> {
        let mut values = Vec::new();
        let dimension = append_fixed_size_list_values(array, None, 0, &mut values)?;
        Ok(Self::from_parts(name, array.len(), dimension, values))
    }

    /// Loads a Parquet column containing `FixedSizeList<Float32, D>` rows.
    ///
    /// # Errors
    /// As [`Self::try_from_parquet_reader`], plus file-open failures.
    pub fn try_from_parquet_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        column: &str,
    ) -> Result<Self, DenseMatrixError> {
        let file = File::open(path)?;
        Self::try_from_parquet_reader(name, file, column)
    }

    /// Loads a Parquet column from any chunked reader.
    ///
    /// # Errors
    /// Returns [`DenseMatrixError::ColumnNotFound`] when the column is absent,
    /// schema errors for columns of the wrong shape, and reader failures.
    pub fn try_from_parquet_reader<R>(
        name: impl Into<String>,
        reader: R,
        column: &str,
    ) -> Result<Self, DenseMatrixError>
    where
        R: ChunkReader + Send + 'static,
    {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
        let mask = ProjectionMask::columns(builder.parquet_schema(), [column]);
        let batches = builder.with_projection(mask).build()?;
        let schema = batches.schema();
        let column_index =
            schema
                .index_of(column)
                .map_err(|_| DenseMatrixError::ColumnNotFound {
                    column: column.to_owned(),
                })?;
        let dimension = validate_fixed_size_list_field(schema.field(column_index), column)?;
        let mut values = Vec::new();
        let mut rows = 0_usize;
        for batch in batches {
            let batch = batch?;
            let column_array = batch.column(column_index);
            let list = column_array
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| DenseMatrixError::InvalidColumnType {
                    column: column.to_owned(),
                    actual: column_array.data_type().clone(),
                })?;
            append_fixed_size_list_values(list, Some(dimension), rows, &mut values)?;
            rows += list.len();
        }
        Ok(Self::from_parts(name, rows, dimension, values))
    }

    /// Loads an `.fvecs` file.
    ///
    /// # Errors
    /// Returns [`DenseMatrixError::TruncatedRecord`] or
    /// [`DenseMatrixError::InvalidRecordHeader`] for malformed records,
    /// [`DenseMatrixError::InvalidRowLength`] when records disagree on their
    /// dimension, and [`DenseMatrixError::ZeroDimension`] for an empty file.
    pub fn try_from_fvecs_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, DenseMatrixError> {
        let file = BufReader::new(File::open(path)?);
        let (dimension, values) = vecs::read_fvecs(file)?;
        Self::try_new(name, dimension, values)
    }

    /// Loads a 2-D little-endian `float32` `.npy` file in C order.
    ///
    /// # Errors
    /// Returns the `Npy*` variants of [`DenseMatrixError`] for headers this
    /// loader cannot read, and [`DenseMatrixError::TruncatedRecord`] when the
    /// payload is shorter than the declared shape.
    pub fn try_from_npy_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, DenseMatrixError> {
        let file = BufReader::new(File::open(path)?);
        let (rows, dimension, values) = npy::read_npy(file)?;
        if dimension == 0 {
            return Err(DenseMatrixError::ZeroDimension);
        }
        Ok(Self::from_parts(name, rows, dimension, values))
    }
}
