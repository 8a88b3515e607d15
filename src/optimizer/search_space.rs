//! Typed hyperparameter records and grids
//!
//! Grids enumerate candidates with keys in sorted order and the last key
//! varying fastest, so candidate `i` is the same across runs.

use crate::training::{Criterion, KernelKind, NeighborAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A hyperparameter candidate
pub trait ParamSet: Clone + Debug + PartialEq + Send + Sync {
    /// `(key, value)` pairs in key order
    fn pairs(&self) -> Vec<(String, String)>;

    /// `key=value, ...` for logs and reports
    fn describe(&self) -> String {
        self.pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Decision tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    pub criterion: Criterion,
    pub max_depth: usize,
}

impl ParamSet for DecisionTreeParams {
    fn pairs(&self) -> Vec<(String, String)> {
        vec![
            ("criterion".to_string(), self.criterion.to_string()),
            ("max_depth".to_string(), self.max_depth.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeGrid {
    pub criterion: Vec<Criterion>,
    pub max_depth: Vec<usize>,
}

impl Default for DecisionTreeGrid {
    fn default() -> Self {
        Self {
            criterion: vec![Criterion::Gini, Criterion::Entropy],
            max_depth: vec![2, 3, 4],
        }
    }
}

impl DecisionTreeGrid {
    pub fn candidates(&self) -> Vec<DecisionTreeParams> {
        self.criterion
            .iter()
            .flat_map(|&criterion| {
                self.max_depth
                    .iter()
                    .map(move |&max_depth| DecisionTreeParams { criterion, max_depth })
            })
            .collect()
    }
}

// ============================================================================
// k-NN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnnParams {
    pub algorithm: NeighborAlgorithm,
    pub n_neighbors: usize,
}

impl ParamSet for KnnParams {
    fn pairs(&self) -> Vec<(String, String)> {
        vec![
            ("algorithm".to_string(), self.algorithm.to_string()),
            ("n_neighbors".to_string(), self.n_neighbors.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnGrid {
    pub algorithm: Vec<NeighborAlgorithm>,
    pub n_neighbors: Vec<usize>,
}

impl Default for KnnGrid {
    fn default() -> Self {
        Self {
            algorithm: vec![
                NeighborAlgorithm::BallTree,
                NeighborAlgorithm::KdTree,
                NeighborAlgorithm::Brute,
            ],
            n_neighbors: vec![3, 5, 10],
        }
    }
}

impl KnnGrid {
    pub fn candidates(&self) -> Vec<KnnParams> {
        self.algorithm
            .iter()
            .flat_map(|&algorithm| {
                self.n_neighbors
                    .iter()
                    .map(move |&n_neighbors| KnnParams { algorithm, n_neighbors })
            })
            .collect()
    }
}

// ============================================================================
// SVM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub kernel: KernelKind,
}

impl ParamSet for SvmParams {
    fn pairs(&self) -> Vec<(String, String)> {
        vec![("kernel".to_string(), self.kernel.to_string())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmGrid {
    pub kernel: Vec<KernelKind>,
}

impl Default for SvmGrid {
    fn default() -> Self {
        Self {
            kernel: vec![
                KernelKind::Linear,
                KernelKind::Poly,
                KernelKind::Rbf,
                KernelKind::Sigmoid,
            ],
        }
    }
}

impl SvmGrid {
    pub fn candidates(&self) -> Vec<SvmParams> {
        self.kernel.iter().map(|&kernel| SvmParams { kernel }).collect()
    }
}

// ============================================================================
// Voting ensemble
// ============================================================================

/// One setting per member; keys are `<member>__<param>`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VotingParams {
    pub dt: DecisionTreeParams,
    pub knn: KnnParams,
    pub svm: SvmParams,
}

fn namespaced(prefix: &str, pairs: Vec<(String, String)>) -> impl Iterator<Item = (String, String)> + '_ {
    pairs
        .into_iter()
        .map(move |(k, v)| (format!("{}__{}", prefix, k), v))
}

impl ParamSet for VotingParams {
    fn pairs(&self) -> Vec<(String, String)> {
        namespaced("dt", self.dt.pairs())
            .chain(namespaced("knn", self.knn.pairs()))
            .chain(namespaced("svm", self.svm.pairs()))
            .collect()
    }
}

/// Cartesian product of the member grids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotingGrid {
    pub dt: DecisionTreeGrid,
    pub knn: KnnGrid,
    pub svm: SvmGrid,
}

impl VotingGrid {
    pub fn candidates(&self) -> Vec<VotingParams> {
        let knn = self.knn.candidates();
        let svm = self.svm.candidates();

        let mut out = Vec::with_capacity(self.len());
        for dt in self.dt.candidates() {
            for &knn in &knn {
                for &svm in &svm {
                    out.push(VotingParams { dt, knn, svm });
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.dt.candidates().len() * self.knn.candidates().len() * self.svm.candidates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
