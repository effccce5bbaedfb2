/// Computes the squared Euclidean distance between two equal-length slices.
///
/// Callers validate dimensionality once at the index boundary; mismatched
/// lengths only compare the shared prefix.
///
/// # Examples
///
/// ```
/// use flatnav_core::distance::squared_l2;
///
/// let distance = squared_l2(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0]);
/// assert!((distance - 50.0).abs() < 1e-6);
/// ```
#[inline]
#[must_use]
pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len(), "dimension mismatch");
    left.iter()
        .zip(right)
        .map(|(&l, &r)| {
            let diff = l - r;
            diff * diff
        })
        .sum()
}
