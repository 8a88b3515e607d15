//! Model trait and classification metrics

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};

/// Common interface of the classifiers
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict class labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Mean accuracy on the given data
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }
}

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(BenchError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(BenchError::ValidationError(
            "accuracy of an empty sample is undefined".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();

    Ok(correct as f64 / y_true.len() as f64)
}

/// Sorted distinct class labels of a target vector
pub(crate) fn unique_classes(y: &Array1<f64>) -> Result<Vec<i64>> {
    if let Some((i, v)) = y.iter().enumerate().find(|(_, v)| (*v - v.round()).abs() > 1e-9) {
        return Err(BenchError::InvalidInput(format!(
            "classifiers require integer class labels, but sample {} has label {}",
            i, v
        )));
    }
    let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
    classes.sort_unstable();
    classes.dedup();
    Ok(classes)
}

/// Check that x and y describe the same number of samples
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(BenchError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(BenchError::ValidationError("no training samples".to_string()));
    }
    Ok(())
}
