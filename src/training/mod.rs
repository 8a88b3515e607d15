//! Model training module
//!
//! The benchmark's base classifiers and the cross-validation splitters used
//! to tune them:
//! - Decision tree (gini / entropy)
//! - K-Nearest Neighbors (brute force, KD tree, ball tree)
//! - Support Vector Machines (linear, poly, rbf, sigmoid)

mod models;
mod neighbors;
pub mod cross_validation;
pub mod decision_tree;
pub mod knn;
pub mod svm;

pub use models::{accuracy, Model};
pub use cross_validation::{CrossValidator, CVStrategy, CVSplit, CVResults};
pub use decision_tree::{DecisionTree, TreeNode, Criterion};
pub use knn::{KNNClassifier, KNNConfig, NeighborAlgorithm};
pub use svm::{SVMClassifier, SVMConfig, KernelKind, KernelType, Gamma};
