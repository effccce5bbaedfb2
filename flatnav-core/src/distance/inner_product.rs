/// Dot product of two equal-length slices.
#[inline]
#[must_use]
pub fn dot(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len(), "dimension mismatch");
    left.iter().zip(right).map(|(&l, &r)| l * r).sum()
}

/// Inner-product distance `1 - <left, right>`.
///
/// Smaller means more similar. The value is negative when the dot product
/// exceeds one, which happens for unnormalised inputs.
///
/// # Examples
///
/// ```
/// use flatnav_core::distance::inner_product_distance;
///
/// assert!((inner_product_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < f32::EPSILON);
/// assert!(inner_product_distance(&[2.0, 0.0], &[1.0, 0.0]) < 0.0);
/// ```
#[inline]
#[must_use]
pub fn inner_product_distance(left: &[f32], right: &[f32]) -> f32 {
    1.0 - dot(left, right)
}
