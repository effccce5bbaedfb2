//! Construction-time parameters for a graph index.

use super::error::IndexError;

/// Structural configuration fixed when an [`crate::Index`] is created.
///
/// Beam widths are per call (`ef_construction` on insert, `ef_search` on
/// search) and therefore not part of this struct.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexParams {
    max_edges: usize,
    capacity: usize,
}

impl IndexParams {
    /// Creates parameters for a graph of at most `capacity` nodes, each with
    /// at most `max_edges` neighbours.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidParameters`] when either value is zero or
    /// does not fit the `u32` fields of the persisted format.
    ///
    /// # Examples
    /// ```
    /// use flatnav_core::IndexParams;
    /// let params = IndexParams::new(16, 1_000).expect("parameters must be valid");
    /// assert_eq!(params.max_edges(), 16);
    /// ```
    pub fn new(max_edges: usize, capacity: usize) -> Result<Self, IndexError> {
        if max_edges == 0 {
            return Err(IndexError::InvalidParameters {
                reason: "max_edges must be greater than zero".into(),
            });
        }
        if u32::try_from(max_edges).is_err() {
            return Err(IndexError::InvalidParameters {
                reason: format!("max_edges ({max_edges}) must fit in 32 bits"),
            });
        }
        if capacity == 0 {
            return Err(IndexError::InvalidParameters {
                reason: "capacity must be greater than zero".into(),
            });
        }
        if u32::try_from(capacity).is_err() {
            return Err(IndexError::InvalidParameters {
                reason: format!("capacity ({capacity}) must fit in 32 bits"),
            });
        }
        Ok(Self {
            max_edges,
            capacity,
        })
    }

    /// Maximum neighbour count `M` enforced after every insertion.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max_edges(&self) -> usize { self.max_edges }

    /// Maximum number of nodes the index accepts.
    #[must_use]
    #[rustfmt::skip]
    pub const fn capacity(&self) -> usize { self.capacity }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 10)]
    #[case(4, 0)]
    fn rejects_zero_values(#[case] max_edges: usize, #[case] capacity: usize) {
        let err = IndexParams::new(max_edges, capacity).expect_err("zero is invalid");
        assert!(matches!(err, IndexError::InvalidParameters { .. }));
    }
}
