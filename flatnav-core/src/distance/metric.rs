//! The closed set of metrics an index can be built for.

use std::{fmt, str::FromStr};

use super::{
    euclidean::squared_l2,
    inner_product::inner_product_distance,
    types::{DistanceError, Result},
};

/// Capability shared by every exact metric: smaller values mean closer.
pub trait Distance: Send + Sync {
    /// Returns the metric this implementation evaluates.
    fn metric(&self) -> Metric;

    /// Computes the distance between two equal-length vectors.
    fn distance(&self, left: &[f32], right: &[f32]) -> f32;
}

/// Squared Euclidean distance. Never negative.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SquaredL2;

impl Distance for SquaredL2 {
    fn metric(&self) -> Metric {
        Metric::Euclidean
    }

    #[inline]
    fn distance(&self, left: &[f32], right: &[f32]) -> f32 {
        squared_l2(left, right)
    }
}

/// Inner-product distance `1 - <a, b>`. May be negative.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InnerProduct;

impl Distance for InnerProduct {
    fn metric(&self) -> Metric {
        Metric::InnerProduct
    }

    #[inline]
    fn distance(&self, left: &[f32], right: &[f32]) -> f32 {
        inner_product_distance(left, right)
    }
}

/// Metric used to compare vectors.
///
/// # Examples
/// ```
/// use flatnav_core::Metric;
///
/// let metric: Metric = "ip".parse().expect("known metric");
/// assert_eq!(metric, Metric::InnerProduct);
/// assert_eq!(Metric::from_id(metric.id()).expect("round trip"), metric);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    Euclidean,
    /// One minus the dot product.
    InnerProduct,
}

impl Metric {
    /// Returns a stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::InnerProduct => "inner_product",
        }
    }

    /// Identifier written to persisted indexes.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Euclidean => 0,
            Self::InnerProduct => 1,
        }
    }

    /// Resolves a persisted identifier.
    ///
    /// # Errors
    /// Returns [`DistanceError::UnknownMetricId`] for identifiers other than
    /// `0` and `1`.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Euclidean),
            1 => Ok(Self::InnerProduct),
            _ => Err(DistanceError::UnknownMetricId { id }),
        }
    }

    /// Computes the distance between two equal-length vectors.
    #[inline]
    #[must_use]
    pub fn distance(self, left: &[f32], right: &[f32]) -> f32 {
        match self {
            Self::Euclidean => squared_l2(left, right),
            Self::InnerProduct => inner_product_distance(left, right),
        }
    }
}

impl Distance for Metric {
    fn metric(&self) -> Metric {
        *self
    }

    #[inline]
    fn distance(&self, left: &[f32], right: &[f32]) -> f32 {
        Self::distance(*self, left, right)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = DistanceError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::Euclidean),
            "ip" | "inner_product" | "angular" => Ok(Self::InnerProduct),
            _ => Err(DistanceError::UnknownMetric {
                name: value.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("l2", Metric::Euclidean)]
    #[case("Euclidean", Metric::Euclidean)]
    #[case("ip", Metric::InnerProduct)]
    #[case("angular", Metric::InnerProduct)]
    #[case(" inner_product ", Metric::InnerProduct)]
    fn parses_known_names(#[case] name: &str, #[case] expected: Metric) {
        assert_eq!(name.parse::<Metric>().expect("known metric"), expected);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "cosine".parse::<Metric>().expect_err("unknown metric");
        assert_eq!(err.code(), crate::DistanceErrorCode::UnknownMetric);
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedConfiguration);
    }

    #[rstest]
    #[case(2)]
    #[case(255)]
    fn rejects_unknown_ids(#[case] id: u8) {
        assert_eq!(
            Metric::from_id(id),
            Err(DistanceError::UnknownMetricId { id })
        );
    }

    #[test]
    fn trait_objects_agree_with_enum_dispatch() {
        let left = [0.5_f32, -1.0, 2.0];
        let right = [1.5_f32, 0.0, -2.0];
        let kernels: [&dyn Distance; 2] = [&SquaredL2, &InnerProduct];
        for kernel in kernels {
            let via_enum = kernel.metric().distance(&left, &right);
            assert!((kernel.distance(&left, &right) - via_enum).abs() < f32::EPSILON);
        }
    }
}
