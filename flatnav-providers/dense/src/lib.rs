//! Dense `f32` datasets loaded into contiguous row-major storage.
//!
//! [`DenseMatrix`] is filled from a Parquet `FixedSizeList<Float32, D>`
//! column, an `.fvecs` file or a 2-D `float32` `.npy` array. Ground-truth
//! neighbour lists are read from `.ivecs` files with [`read_ground_truth`].

mod errors;
mod format;
mod ingest;
mod matrix;
mod npy;
mod vecs;

pub use errors::DenseMatrixError;
pub use format::DataFormat;
pub use matrix::DenseMatrix;
pub use vecs::{read_ground_truth, read_ivecs, write_fvecs, write_ivecs};

#[cfg(test)]
mod tests;
