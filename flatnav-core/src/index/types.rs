//! Value types shared by graph traversal, neighbour selection, and results.

use std::cmp::{Ordering, Reverse};

/// Caller-supplied identifier stored with each vector. Never interpreted.
pub type Label = u64;

/// Node discovered during traversal together with its distance to the query.
///
/// Ordered by distance via [`f32::total_cmp`], then by ascending id, so that
/// on equal distances the lower internal index sorts first.
///
/// # Examples
/// ```
/// use flatnav_core::Neighbour;
///
/// let near = Neighbour { id: 7, distance: 0.5 };
/// let tie = Neighbour { id: 2, distance: 0.5 };
/// assert!(tie < near);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Internal node index.
    pub id: usize,
    /// Distance between the query and [`Neighbour::id`].
    pub distance: f32,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap adaptor for [`Neighbour`].
pub(crate) type Frontier = Reverse<Neighbour>;

/// A search result as seen by callers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchHit {
    /// Label supplied when the vector was inserted.
    pub label: Label,
    /// Distance from the query under the index codec.
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    #[test]
    fn frontier_pops_closest_first_and_lower_id_on_ties() {
        let mut heap: BinaryHeap<Frontier> = [
            Neighbour { id: 4, distance: 1.0 },
            Neighbour { id: 1, distance: 2.0 },
            Neighbour { id: 3, distance: 1.0 },
        ]
        .into_iter()
        .map(Reverse)
        .collect();
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|Reverse(n)| n.id)).collect();
        assert_eq!(order, vec![3, 4, 1]);
    }
}
