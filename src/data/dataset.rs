//! In-memory labelled dataset

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric feature matrix with one class label per row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Features, one row per sample
    pub features: Array2<f64>,
    /// Class labels (integral values stored as f64)
    pub target: Array1<f64>,
    /// Column names
    pub feature_names: Vec<String>,
    /// Class names indexed by label
    pub target_names: Vec<String>,
}

impl Dataset {
    /// Create a dataset, checking that shapes agree
    pub fn new(
        features: Array2<f64>,
        target: Array1<f64>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(BenchError::ShapeError {
                expected: format!("target length = {}", features.nrows()),
                actual: format!("target length = {}", target.len()),
            });
        }
        if !feature_names.is_empty() && feature_names.len() != features.ncols() {
            return Err(BenchError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if let Some((i, v)) = target.iter().enumerate().find(|(_, v)| (*v - v.round()).abs() > 1e-9) {
            return Err(BenchError::DataError(format!(
                "label of sample {} is not a class index: {}",
                i, v
            )));
        }

        Ok(Self {
            features,
            target,
            feature_names,
            target_names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of samples per class label, ordered by label
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for &v in self.target.iter() {
            *counts.entry(v.round() as i64).or_insert(0) += 1;
        }
        counts
    }

    /// Copy out the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        (
            self.features.select(Axis(0), indices),
            self.target.select(Axis(0), indices),
        )
    }
}
