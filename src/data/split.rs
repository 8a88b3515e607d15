//! Seeded train/test split

use super::Dataset;
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A train/test partition of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    /// Dataset rows that went to the training set, in training-set order
    pub train_indices: Vec<usize>,
    /// Dataset rows that went to the test set, in test-set order
    pub test_indices: Vec<usize>,
}

impl Split {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// Shuffle row indices with `seed` and hold out `ceil(test_size * n)` of them.
pub fn train_test_split(dataset: &Dataset, test_size: f64, seed: u64) -> Result<Split> {
    let n_samples = dataset.n_samples();

    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(BenchError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(BenchError::ValidationError(format!(
            "test_size {} leaves an empty partition for {} samples",
            test_size, n_samples
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    let (x_train, y_train) = dataset.select_rows(&train_indices);
    let (x_test, y_test) = dataset.select_rows(&test_indices);

    Ok(Split {
        x_train,
        y_train,
        x_test,
        y_test,
        train_indices,
        test_indices,
    })
}
