//! On-disk dataset formats.
use std::{fmt, path::Path, str::FromStr};

use crate::errors::DenseMatrixError;

/// File formats [`crate::DenseMatrix::load`] understands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataFormat {
    /// Parquet with a `FixedSizeList<Float32, D>` column.
    Parquet,
    /// `.fvecs` records.
    Fvecs,
    /// 2-D `float32` NumPy array.
    Npy,
}

impl DataFormat {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Fvecs => "fvecs",
            Self::Npy => "npy",
        }
    }

    /// Infers the format from a file extension.
    ///
    /// # Errors
    /// Returns [`DenseMatrixError::UnknownFormat`] for unrecognised or
    /// missing extensions.
    ///
    /// # Examples
    /// ```
    /// use flatnav_providers_dense::DataFormat;
    ///
    /// assert_eq!(DataFormat::from_path("base.fvecs").expect("known"), DataFormat::Fvecs);
    /// assert!(DataFormat::from_path("base.csv").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DenseMatrixError> {
        let path = path.as_ref();
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| DenseMatrixError::UnknownFormat {
                path: path.display().to_string(),
            })
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = DenseMatrixError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "parquet" | "pq" => Ok(Self::Parquet),
            "fvecs" => Ok(Self::Fvecs),
            "npy" => Ok(Self::Npy),
            _ => Err(DenseMatrixError::UnknownFormat {
                path: value.to_owned(),
            }),
        }
    }
}
