//! ensemble-bench - grid-searched classifier benchmark
//!
//! Tunes a decision tree, k-nearest neighbours and a support vector machine
//! on the breast-cancer dataset, then a hard-voting ensemble over all three,
//! recording best hyperparameters and accuracies to an experiment tracker.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`config`] - Benchmark configuration
//! - [`data`] - Dataset loading and train/test split
//! - [`experiment`] - The staged benchmark and its report
//!
//! ## Models
//! - [`training`] - Decision tree, k-NN, SVM and cross-validation
//! - [`ensemble`] - Hard-voting ensemble
//! - [`optimizer`] - Grid search over typed parameter grids
//!
//! ## Infrastructure
//! - [`tracking`] - Experiment tracking (local JSON store, MLflow REST)
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data and models
pub mod data;
pub mod training;
pub mod ensemble;
pub mod optimizer;

// Pipeline
pub mod experiment;
pub mod tracking;

// Services
pub mod cli;

pub use error::{BenchError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{BenchError, Result};

    // Configuration
    pub use crate::config::{BenchConfig, DatasetSource};

    // Data
    pub use crate::data::{load_breast_cancer, train_test_split, Dataset, Split};

    // Training
    pub use crate::training::{
        accuracy, Criterion, CrossValidator, DecisionTree, KNNClassifier, KernelKind, Model,
        NeighborAlgorithm, SVMClassifier,
    };

    // Ensemble
    pub use crate::ensemble::VotingClassifier;

    // Optimization
    pub use crate::optimizer::{EstimatorSpec, GridSearch, ParamSet, SearchOutcome};

    // Pipeline
    pub use crate::experiment::{
        classifiers, grid_search, load_data, BenchReport, ClassifierReport, ExperimentRunner,
    };

    // Experiment tracking
    pub use crate::tracking::{ExperimentTracker, MemorySink, ParamSink, TrackingBackend};
}
