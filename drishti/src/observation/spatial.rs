//! K-d tree wrapper for neighbor queries over point clouds.

use kiddo::SquaredEuclidean;
use kiddo::float::kdtree::KdTree;

/// Magnitude of the per-point offset applied on insertion (meters).
const JITTER: f32 = 1e-5;

/// Bucket size; larger than the default so flat faces do not overflow a leaf.
const BUCKET: usize = 256;

type Tree<const K: usize> = KdTree<f32, u64, K, BUCKET, u32>;

/// Deterministic offset of a few microns for point `index` along `axis`.
///
/// Depth quantization puts many points of a flat face on exactly the same
/// coordinate, which the tree's bucket splitting cannot separate.
#[inline]
fn jitter(index: usize, axis: usize) -> f32 {
    let h = (index as u32)
        .wrapping_mul(2_654_435_761)
        .wrapping_add((axis as u32).wrapping_mul(40_503))
        .rotate_left(13);
    ((h >> 8) as f32 / (1u32 << 24) as f32 - 0.5) * JITTER
}

/// Immutable-after-build k-d tree over `K`-dimensional points.
pub struct SpatialIndex<const K: usize> {
    tree: Tree<K>,
    len: usize,
}

impl<const K: usize> SpatialIndex<K> {
    /// Build an index; item `i` refers to `points[i]`.
    pub fn build(points: &[[f32; K]]) -> Self {
        let mut tree = Tree::<K>::new();
        for (i, p) in points.iter().enumerate() {
            let mut q = *p;
            for (axis, v) in q.iter_mut().enumerate() {
                *v += jitter(i, axis);
            }
            tree.add(&q, i as u64);
        }
        Self {
            tree,
            len: points.len(),
        }
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest point index and squared distance.
    pub fn nearest(&self, query: &[f32; K]) -> Option<(usize, f32)> {
        if self.len == 0 {
            return None;
        }
        let n = self.tree.nearest_one::<SquaredEuclidean>(query);
        Some((n.item as usize, n.distance))
    }

    /// Indices of the `n` nearest points, closest first.
    pub fn nearest_n(&self, query: &[f32; K], n: usize) -> Vec<usize> {
        if self.len == 0 || n == 0 {
            return Vec::new();
        }
        self.tree
            .nearest_n::<SquaredEuclidean>(query, n)
            .into_iter()
            .map(|neighbour| neighbour.item as usize)
            .collect()
    }

    /// Whether any point lies within `radius`.
    pub fn has_neighbor_within(&self, query: &[f32; K], radius: f32) -> bool {
        self.nearest(query)
            .is_some_and(|(_, d2)| d2 <= radius * radius)
    }

    /// Indices of all points within `radius`, in ascending index order.
    pub fn within(&self, query: &[f32; K], radius: f32) -> Vec<usize> {
        if self.len == 0 {
            return Vec::new();
        }
        let mut items: Vec<usize> = self
            .tree
            .within::<SquaredEuclidean>(query, radius * radius)
            .into_iter()
            .map(|n| n.item as usize)
            .collect();
        items.sort_unstable();
        items
    }
}
