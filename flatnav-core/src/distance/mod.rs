//! Distance primitives for the two supported metrics.
//!
//! The kernels ([`squared_l2`], [`inner_product_distance`]) sit on the search
//! hot path and trust their callers: the index and the quantizers validate
//! dimensionality and finiteness once, where vectors enter.

mod euclidean;
mod inner_product;
mod metric;
mod types;

pub use self::euclidean::squared_l2;
pub use self::inner_product::{dot, inner_product_distance};
pub use self::metric::{Distance, InnerProduct, Metric, SquaredL2};
pub use self::types::{DistanceError, DistanceErrorCode, Result};
