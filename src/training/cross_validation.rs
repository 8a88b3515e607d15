//! Cross-validation splitters

use crate::error::{BenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Unshuffled stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize },
}

impl CVStrategy {
    pub fn stratified(n_splits: usize) -> Self {
        CVStrategy::StratifiedKFold { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::StratifiedKFold { n_splits } => *n_splits,
        }
    }
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::stratified(crate::config::DEFAULT_CV_FOLDS)
    }
}

/// A single train/test split; both index lists are ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CVStrategy {
        &self.strategy
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(BenchError::ValidationError(
                "n_splits must be at least 2".to_string()
            ));
        }
        if n_samples < n_splits {
            return Err(BenchError::ValidationError(
                format!("n_samples ({}) must be >= n_splits ({})", n_samples, n_splits)
            ));
        }

        match &self.strategy {
            CVStrategy::StratifiedKFold { .. } => {
                let y = y.ok_or_else(|| BenchError::ValidationError(
                    "StratifiedKFold requires target array".to_string()
                ))?;
                if y.len() != n_samples {
                    return Err(BenchError::ShapeError {
                        expected: format!("{} targets", n_samples),
                        actual: format!("{} targets", y.len()),
                    });
                }
                stratified_k_fold_split(y, n_splits)
            }
        }
    }
}

/// Each class is dealt to the folds in contiguous blocks, sized so that the
/// folds receive the class in proportion. Classes are ordered by first
/// appearance in `y`.
fn stratified_k_fold_split(y: &Array1<f64>, n_splits: usize) -> Result<Vec<CVSplit>> {
    let mut first_seen: BTreeMap<i64, usize> = BTreeMap::new();
    for &val in y.iter() {
        let next = first_seen.len();
        first_seen.entry(val.round() as i64).or_insert(next);
    }
    let n_classes = first_seen.len();
    let encoded: Vec<usize> = y.iter().map(|&v| first_seen[&(v.round() as i64)]).collect();

    let mut counts = vec![0usize; n_classes];
    for &c in &encoded {
        counts[c] += 1;
    }
    let largest = counts.iter().copied().max().unwrap_or(0);
    let smallest = counts.iter().copied().min().unwrap_or(0);
    if n_splits > largest {
        return Err(BenchError::ValidationError(format!(
            "n_splits={} cannot be greater than the number of members in each class",
            n_splits
        )));
    }
    if n_splits > smallest {
        warn!(
            least_populated = smallest,
            n_splits, "The least populated class has fewer members than n_splits"
        );
    }

    // allocation[fold][class]: deal the sorted labels round-robin over the folds
    let mut sorted = encoded.clone();
    sorted.sort_unstable();
    let mut allocation = vec![vec![0usize; n_classes]; n_splits];
    for (pos, &c) in sorted.iter().enumerate() {
        allocation[pos % n_splits][c] += 1;
    }

    let mut test_folds = vec![0usize; y.len()];
    for class in 0..n_classes {
        let folds_for_class = (0..n_splits)
            .flat_map(|f| std::iter::repeat(f).take(allocation[f][class]));
        let members = encoded
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == class)
            .map(|(i, _)| i);
        for (idx, fold) in members.zip(folds_for_class) {
            test_folds[idx] = fold;
        }
    }

    Ok(splits_from_assignment(&test_folds, n_splits))
}

fn splits_from_assignment(test_folds: &[usize], n_splits: usize) -> Vec<CVSplit> {
    (0..n_splits)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..test_folds.len()).partition(|&i| test_folds[i] == fold_idx);
            CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect()
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self { scores, mean_score: f64::NAN, std_score: f64::NAN, n_folds };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}
