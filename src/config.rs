//! Benchmark configuration
//!
//! Defaults reproduce the fixed experiment: seed 42, 70/30 split, 10-fold CV,
//! experiment `ensamble_2`, run `test_ensemble_1`, local `./bench-runs` store.
//! Environment variables override the defaults, CLI flags override both.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shared seed for the split and every seeded estimator
pub const DEFAULT_SEED: u64 = 42;
/// Fraction of samples held out for testing
pub const DEFAULT_TEST_SIZE: f64 = 0.3;
/// Cross-validation folds used by every grid search
pub const DEFAULT_CV_FOLDS: usize = 10;
/// Local tracking directory; the JSON store is not MLflow's `mlruns` layout
pub const DEFAULT_TRACKING_DIR: &str = "./bench-runs";

/// Where the dataset comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetSource {
    /// Built-in breast-cancer dataset
    Bundled,
    /// scikit-learn style `breast_cancer.csv`
    Csv(PathBuf),
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self::Bundled
    }
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Seed for the split and seeded estimators
    pub seed: u64,
    /// Held-out fraction in (0, 1)
    pub test_size: f64,
    /// Number of CV folds
    pub cv_folds: usize,
    /// Tracking store location (directory, `file:` URI or `http(s)://` MLflow server)
    pub tracking_uri: String,
    /// Experiment name
    pub experiment_name: String,
    /// Run name
    pub run_name: String,
    /// Reuse an existing experiment of the same name instead of failing
    pub reuse_experiment: bool,
    /// Dataset source
    pub dataset: DatasetSource,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: std::env::var("BENCH_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SEED),
            test_size: DEFAULT_TEST_SIZE,
            cv_folds: DEFAULT_CV_FOLDS,
            tracking_uri: std::env::var("MLFLOW_TRACKING_URI")
                .unwrap_or_else(|_| DEFAULT_TRACKING_DIR.to_string()),
            experiment_name: std::env::var("BENCH_EXPERIMENT")
                .unwrap_or_else(|_| "ensamble_2".to_string()),
            run_name: std::env::var("BENCH_RUN_NAME")
                .unwrap_or_else(|_| "test_ensemble_1".to_string()),
            reuse_experiment: false,
            dataset: std::env::var("BENCH_DATASET")
                .map(|p| DatasetSource::Csv(PathBuf::from(p)))
                .unwrap_or_default(),
        }
    }
}

impl BenchConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = name.into();
        self
    }

    pub fn with_reuse_experiment(mut self, reuse: bool) -> Self {
        self.reuse_experiment = reuse;
        self
    }

    pub fn with_dataset(mut self, source: DatasetSource) -> Self {
        self.dataset = source;
        self
    }

    /// Check value ranges before any work starts
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(BenchError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(BenchError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "at least 2 folds are required".to_string(),
            });
        }
        if self.experiment_name.trim().is_empty() {
            return Err(BenchError::ConfigError("experiment name is empty".to_string()));
        }
        if self.run_name.trim().is_empty() {
            return Err(BenchError::ConfigError("run name is empty".to_string()));
        }
        Ok(())
    }
}
