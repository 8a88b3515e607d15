//! Nearest-neighbour search structures
//!
//! Every index returns the same answer for a query: the `k` training rows
//! with the smallest `(squared euclidean distance, row index)`. The trees
//! only change how many rows get examined.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Squared euclidean distance to the query
    pub dist_sq: f64,
    /// Row in the training matrix
    pub index: usize,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

/// Bounded max-heap keeping the k best candidates
struct KnnHeap {
    k: usize,
    heap: BinaryHeap<Neighbor>,
}

impl KnnHeap {
    fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    fn push(&mut self, candidate: Neighbor) {
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(top) = self.heap.peek() {
            if candidate < *top {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    /// True when nothing at squared distance `bound_sq` or more can enter the heap.
    /// The slack keeps rounding in the bounds from dropping exact ties.
    fn can_prune(&self, bound_sq: f64) -> bool {
        if self.heap.len() < self.k {
            return false;
        }
        match self.heap.peek() {
            Some(top) => bound_sq > top.dist_sq * (1.0 + 1e-9) + 1e-12,
            None => false,
        }
    }

    fn into_sorted(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

pub(crate) fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| {
            let d = ai - bi;
            d * d
        })
        .sum()
}

/// Dimension with the largest value range over `indices`, with that range
fn widest_dimension(data: &Array2<f64>, indices: &[usize]) -> (usize, f64) {
    let mut best = (0, 0.0);
    for dim in 0..data.ncols() {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &i in indices {
            let v = data[[i, dim]];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let spread = hi - lo;
        if spread > best.1 {
            best = (dim, spread);
        }
    }
    best
}

/// Sort indices along `dim` and cut them at the median
fn median_split(data: &Array2<f64>, mut indices: Vec<usize>, dim: usize) -> (Vec<usize>, Vec<usize>, f64) {
    indices.sort_by(|&a, &b| {
        data[[a, dim]]
            .total_cmp(&data[[b, dim]])
            .then(a.cmp(&b))
    });
    let mid = indices.len() / 2;
    let value = data[[indices[mid], dim]];
    let right = indices.split_off(mid);
    (indices, right, value)
}

// ============================================================================
// KD tree
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
enum KdNode {
    Leaf(Vec<usize>),
    Split {
        dim: usize,
        value: f64,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

/// Axis-aligned binary space partition; rows left of a split are `<= value`, right `>= value`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdTree {
    root: KdNode,
}

impl KdTree {
    pub fn build(data: &Array2<f64>, leaf_size: usize) -> Self {
        let indices: Vec<usize> = (0..data.nrows()).collect();
        Self {
            root: Self::build_node(data, indices, leaf_size.max(1)),
        }
    }

    fn build_node(data: &Array2<f64>, indices: Vec<usize>, leaf_size: usize) -> KdNode {
        if indices.len() <= leaf_size {
            return KdNode::Leaf(indices);
        }
        let (dim, spread) = widest_dimension(data, &indices);
        if spread <= 0.0 {
            return KdNode::Leaf(indices);
        }
        let (left, right, value) = median_split(data, indices, dim);
        KdNode::Split {
            dim,
            value,
            left: Box::new(Self::build_node(data, left, leaf_size)),
            right: Box::new(Self::build_node(data, right, leaf_size)),
        }
    }

    fn search(node: &KdNode, data: &Array2<f64>, point: ArrayView1<f64>, heap: &mut KnnHeap) {
        match node {
            KdNode::Leaf(indices) => {
                for &i in indices {
                    heap.push(Neighbor {
                        dist_sq: squared_distance(point, data.row(i)),
                        index: i,
                    });
                }
            }
            KdNode::Split { dim, value, left, right } => {
                let diff = point[*dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };
                Self::search(near, data, point, heap);
                if !heap.can_prune(diff * diff) {
                    Self::search(far, data, point, heap);
                }
            }
        }
    }
}

// ============================================================================
// Ball tree
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BallNode {
    centroid: Array1<f64>,
    radius: f64,
    children: Option<(Box<BallNode>, Box<BallNode>)>,
    indices: Vec<usize>,
}

/// Nested hyperspheres; each node bounds all rows below it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallTree {
    root: BallNode,
}

impl BallTree {
    pub fn build(data: &Array2<f64>, leaf_size: usize) -> Self {
        let indices: Vec<usize> = (0..data.nrows()).collect();
        Self {
            root: Self::build_node(data, indices, leaf_size.max(1)),
        }
    }

    fn build_node(data: &Array2<f64>, indices: Vec<usize>, leaf_size: usize) -> BallNode {
        let centroid = data
            .select(Axis(0), &indices)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(data.ncols()));
        let radius = indices
            .iter()
            .map(|&i| squared_distance(centroid.view(), data.row(i)).sqrt())
            .fold(0.0, f64::max);

        if indices.len() <= leaf_size {
            return BallNode { centroid, radius, children: None, indices };
        }
        let (dim, spread) = widest_dimension(data, &indices);
        if spread <= 0.0 {
            return BallNode { centroid, radius, children: None, indices };
        }

        let (left, right, _) = median_split(data, indices, dim);
        BallNode {
            centroid,
            radius,
            children: Some((
                Box::new(Self::build_node(data, left, leaf_size)),
                Box::new(Self::build_node(data, right, leaf_size)),
            )),
            indices: Vec::new(),
        }
    }

    fn search(node: &BallNode, data: &Array2<f64>, point: ArrayView1<f64>, heap: &mut KnnHeap) {
        let to_centroid = squared_distance(point, node.centroid.view()).sqrt();
        let bound = (to_centroid - node.radius).max(0.0);
        if heap.can_prune(bound * bound) {
            return;
        }

        match &node.children {
            None => {
                for &i in &node.indices {
                    heap.push(Neighbor {
                        dist_sq: squared_distance(point, data.row(i)),
                        index: i,
                    });
                }
            }
            Some((left, right)) => {
                let dl = squared_distance(point, left.centroid.view());
                let dr = squared_distance(point, right.centroid.view());
                let (near, far) = if dl <= dr { (left, right) } else { (right, left) };
                Self::search(near, data, point, heap);
                Self::search(far, data, point, heap);
            }
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Built search structure for one training matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NeighborIndex {
    Brute,
    KdTree(KdTree),
    BallTree(BallTree),
}

impl NeighborIndex {
    /// The `k` nearest training rows of `point`, nearest first
    pub fn query(&self, data: &Array2<f64>, point: ArrayView1<f64>, k: usize) -> Vec<Neighbor> {
        let mut heap = KnnHeap::new(k);
        match self {
            NeighborIndex::Brute => {
                for (i, row) in data.rows().into_iter().enumerate() {
                    heap.push(Neighbor {
                        dist_sq: squared_distance(point, row),
                        index: i,
                    });
                }
            }
            NeighborIndex::KdTree(tree) => KdTree::search(&tree.root, data, point, &mut heap),
            NeighborIndex::BallTree(tree) => BallTree::search(&tree.root, data, point, &mut heap),
        }
        heap.into_sorted()
    }
}
