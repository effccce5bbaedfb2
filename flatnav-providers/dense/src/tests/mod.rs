pub(crate) use super::{DataFormat, DenseMatrix, DenseMatrixError};

mod format;
mod npy;
mod support;
