//! Lloyd's k-means over one contiguous subspace of a row-major sample.

use rand::{SeedableRng, rngs::SmallRng, seq::index::sample};
use tracing::trace;

use crate::distance::squared_l2;

/// Column window of a row-major matrix that k-means clusters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Subspace {
    pub(crate) offset: usize,
    pub(crate) width: usize,
}

impl Subspace {
    #[inline]
    pub(crate) fn slice<'a>(&self, row: &'a [f32]) -> &'a [f32] {
        row.get(self.offset..self.offset + self.width).unwrap_or(&[])
    }
}

/// Clustering settings shared by every subspace.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KMeans {
    pub(crate) clusters: usize,
    pub(crate) iterations: u32,
    pub(crate) seed: u64,
}

impl KMeans {
    /// Clusters `subspace` of `count` rows of width `dimension`.
    ///
    /// Returns `clusters * subspace.width` centroid values. The caller has
    /// already checked that `count >= clusters` and that every value is finite.
    pub(crate) fn fit(
        &self,
        vectors: &[f32],
        count: usize,
        dimension: usize,
        subspace: Subspace,
    ) -> Vec<f32> {
        let width = subspace.width;
        let rows = || {
            vectors
                .chunks_exact(dimension)
                .take(count)
                .map(|row| subspace.slice(row))
        };

        let mut rng = SmallRng::seed_from_u64(self.seed ^ subspace.offset as u64);
        let mut centroids = Vec::with_capacity(self.clusters * width);
        let picks = sample(&mut rng, count, self.clusters);
        let chosen: Vec<&[f32]> = rows().collect();
        for pick in picks.iter() {
            if let Some(row) = chosen.get(pick) {
                centroids.extend_from_slice(row);
            }
        }

        let mut assignments = vec![usize::MAX; count];
        for iteration in 0..self.iterations {
            let changed = assign(&chosen, &centroids, width, &mut assignments);
            trace!(offset = subspace.offset, iteration, changed, "k-means pass");
            if changed == 0 && iteration > 0 {
                break;
            }
            update(&chosen, &mut assignments, &mut centroids, width);
        }
        centroids
    }
}

/// Index of the centroid nearest to `point`. Ties go to the lower index.
#[inline]
pub(crate) fn nearest(point: &[f32], centroids: &[f32], width: usize) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (index, centroid) in centroids.chunks_exact(width).enumerate() {
        let distance = squared_l2(point, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn assign(rows: &[&[f32]], centroids: &[f32], width: usize, assignments: &mut [usize]) -> usize {
    let mut changed = 0;
    for (row, slot) in rows.iter().zip(assignments.iter_mut()) {
        let cluster = nearest(row, centroids, width);
        if *slot != cluster {
            *slot = cluster;
            changed += 1;
        }
    }
    changed
}

fn update(rows: &[&[f32]], assignments: &mut [usize], centroids: &mut [f32], width: usize) {
    let clusters = centroids.len() / width;
    let mut sums = vec![0.0_f64; centroids.len()];
    let mut counts = vec![0_usize; clusters];

    for (row, &cluster) in rows.iter().zip(assignments.iter()) {
        if let Some(count) = counts.get_mut(cluster) {
            *count += 1;
        }
        let start = cluster * width;
        if let Some(sum) = sums.get_mut(start..start + width) {
            for (acc, &value) in sum.iter_mut().zip(row.iter()) {
                *acc += f64::from(value);
            }
        }
    }

    for ((centroid, sum), &count) in centroids
        .chunks_exact_mut(width)
        .zip(sums.chunks_exact(width))
        .zip(&counts)
    {
        if count == 0 {
            continue;
        }
        let scale = 1.0 / count as f64;
        for (value, &total) in centroid.iter_mut().zip(sum) {
            *value = (total * scale) as f32;
        }
    }

    for (cluster, _) in counts.iter().enumerate().filter(|(_, count)| **count == 0) {
        reseed_empty(rows, assignments, centroids, width, cluster);
    }
}

/// Moves the row farthest from its centroid into the empty `cluster`.
fn reseed_empty(
    rows: &[&[f32]],
    assignments: &mut [usize],
    centroids: &mut [f32],
    width: usize,
    cluster: usize,
) {
    let mut farthest = None;
    let mut farthest_distance = -1.0_f32;
    for (index, (row, &owner)) in rows.iter().zip(assignments.iter()).enumerate() {
        let start = owner * width;
        let Some(centroid) = centroids.get(start..start + width) else {
            continue;
        };
        let distance = squared_l2(row, centroid);
        if distance > farthest_distance {
            farthest = Some(index);
            farthest_distance = distance;
        }
    }
    let Some(index) = farthest else {
        return;
    };
    let start = cluster * width;
    if let (Some(row), Some(target)) = (rows.get(index), centroids.get_mut(start..start + width)) {
        target.copy_from_slice(row);
    }
    if let Some(slot) = assignments.get_mut(index) {
        *slot = cluster;
    }
}
