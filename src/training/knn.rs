//! K-Nearest Neighbors classifier
//!
//! Euclidean distance, uniform weights. The search structure is chosen by
//! [`NeighborAlgorithm`]; all of them find the same neighbours.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::models::{check_xy, unique_classes, Model};
use super::neighbors::{BallTree, KdTree, Neighbor, NeighborIndex};
use crate::error::{BenchError, Result};

/// Default leaf size of the tree indexes
pub const DEFAULT_LEAF_SIZE: usize = 30;

/// Neighbour search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborAlgorithm {
    BallTree,
    KdTree,
    Brute,
}

impl NeighborAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BallTree => "ball_tree",
            Self::KdTree => "kd_tree",
            Self::Brute => "brute",
        }
    }
}

impl Default for NeighborAlgorithm {
    fn default() -> Self {
        Self::Brute
    }
}

impl fmt::Display for NeighborAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeighborAlgorithm {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ball_tree" => Ok(Self::BallTree),
            "kd_tree" => Ok(Self::KdTree),
            "brute" => Ok(Self::Brute),
            other => Err(BenchError::InvalidParameter {
                name: "algorithm".to_string(),
                value: other.to_string(),
                reason: "expected one of ball_tree, kd_tree, brute".to_string(),
            }),
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Search structure
    pub algorithm: NeighborAlgorithm,
    /// Rows per tree leaf
    pub leaf_size: usize,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            algorithm: NeighborAlgorithm::default(),
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
    classes: Vec<i64>,
    index: Option<NeighborIndex>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
            classes: Vec::new(),
            index: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn with_algorithm(mut self, algorithm: NeighborAlgorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.config.leaf_size = leaf_size;
        self
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }

    fn fitted(&self) -> Result<(&Array2<f64>, &Array1<f64>, &NeighborIndex)> {
        match (&self.x_train, &self.y_train, &self.index) {
            (Some(x), Some(y), Some(index)) => Ok((x, y, index)),
            _ => Err(BenchError::ModelNotFitted),
        }
    }

    /// Training-row indices of the k nearest neighbours of each query row, nearest first
    pub fn kneighbors(&self, x: &Array2<f64>) -> Result<Vec<Vec<usize>>> {
        let (x_train, _, index) = self.fitted()?;
        self.check_width(x, x_train)?;
        let k = self.config.n_neighbors;

        Ok((0..x.nrows())
            .into_par_iter()
            .map(|i| {
                index
                    .query(x_train, x.row(i), k)
                    .into_iter()
                    .map(|n| n.index)
                    .collect()
            })
            .collect())
    }

    fn check_width(&self, x: &Array2<f64>, x_train: &Array2<f64>) -> Result<()> {
        if x.ncols() != x_train.ncols() {
            return Err(BenchError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }
}

impl Model for KNNClassifier {
    /// Store the training data and build the search index
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        let k = self.config.n_neighbors;
        if k == 0 || k > x.nrows() {
            return Err(BenchError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: k.to_string(),
                reason: format!("must be in 1..={} for this training set", x.nrows()),
            });
        }

        self.classes = unique_classes(y)?;
        self.index = Some(match self.config.algorithm {
            NeighborAlgorithm::Brute => NeighborIndex::Brute,
            NeighborAlgorithm::KdTree => NeighborIndex::KdTree(KdTree::build(x, self.config.leaf_size)),
            NeighborAlgorithm::BallTree => {
                NeighborIndex::BallTree(BallTree::build(x, self.config.leaf_size))
            }
        });
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());

        Ok(())
    }

    /// Predict class labels (parallelized over test samples)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train, index) = self.fitted()?;
        self.check_width(x, x_train)?;
        let k = self.config.n_neighbors;
        let classes = &self.classes;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = index.query(x_train, x.row(i), k);
                vote_classify(&neighbors, y_train, classes)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Majority vote; ties go to the smallest label
fn vote_classify(neighbors: &[Neighbor], y_train: &Array1<f64>, classes: &[i64]) -> f64 {
    let mut counts = vec![0usize; classes.len()];
    for n in neighbors {
        let label = y_train[n.index].round() as i64;
        if let Ok(pos) = classes.binary_search(&label) {
            counts[pos] += 1;
        }
    }

    let mut best = 0;
    for (pos, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = pos;
        }
    }
    classes.get(best).copied().unwrap_or(0) as f64
}
