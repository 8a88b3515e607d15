//! Hard-voting ensemble

use crate::error::{BenchError, Result};
use crate::training::Model;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::fmt;

/// Voting classifier ensemble
///
/// Every member casts one vote per sample and the most frequent label wins.
/// When labels tie, the smallest label wins.
pub struct VotingClassifier {
    members: Vec<(String, Box<dyn Model>)>,
    is_fitted: bool,
}

impl VotingClassifier {
    /// Create an empty ensemble
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            is_fitted: false,
        }
    }

    /// Append a named member; order decides ties
    pub fn with_estimator<M: Model + 'static>(mut self, name: impl Into<String>, model: M) -> Self {
        self.members.push((name.into(), Box::new(model)));
        self.is_fitted = false;
        self
    }

    /// Member names in voting order
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Predictions of each member, in member order
    pub fn member_predictions(&self, x: &Array2<f64>) -> Result<Vec<Array1<f64>>> {
        if !self.is_fitted {
            return Err(BenchError::ModelNotFitted);
        }
        self.members.iter().map(|(_, m)| m.predict(x)).collect()
    }

    /// Combine per-member predictions by hard vote
    pub fn predict_from_predictions(predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
        let first = predictions.first().ok_or_else(|| {
            BenchError::ValidationError("No predictions provided".to_string())
        })?;
        let n_samples = first.len();
        if let Some(bad) = predictions.iter().find(|p| p.len() != n_samples) {
            return Err(BenchError::ShapeError {
                expected: format!("{} predictions per member", n_samples),
                actual: format!("{} predictions", bad.len()),
            });
        }

        let mut result = Array1::zeros(n_samples);
        // (label, votes); ties go to the smallest label
        let mut tally: Vec<(i64, usize)> = Vec::with_capacity(predictions.len());
        for i in 0..n_samples {
            tally.clear();
            for pred in predictions {
                let label = pred[i].round() as i64;
                match tally.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, votes)) => *votes += 1,
                    None => tally.push((label, 1)),
                }
            }

            let mut winner = tally[0];
            for &entry in &tally[1..] {
                if entry.1 > winner.1 || (entry.1 == winner.1 && entry.0 < winner.0) {
                    winner = entry;
                }
            }
            result[i] = winner.0 as f64;
        }

        Ok(result)
    }

    fn check_names(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(BenchError::ValidationError(
                "VotingClassifier needs at least one estimator".to_string(),
            ));
        }
        for (i, (name, _)) in self.members.iter().enumerate() {
            if name.is_empty() || name.contains("__") {
                return Err(BenchError::InvalidParameter {
                    name: "estimators".to_string(),
                    value: name.clone(),
                    reason: "names must be non-empty and must not contain '__'".to_string(),
                });
            }
            if self.members[..i].iter().any(|(other, _)| other == name) {
                return Err(BenchError::InvalidParameter {
                    name: "estimators".to_string(),
                    value: name.clone(),
                    reason: "names must be unique".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for VotingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VotingClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VotingClassifier")
            .field("estimators", &self.names())
            .field("is_fitted", &self.is_fitted)
            .finish()
    }
}

impl Model for VotingClassifier {
    /// Fit every member on the same data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.check_names()?;
        self.members
            .par_iter_mut()
            .map(|(_, model)| model.fit(x, y))
            .collect::<Result<Vec<()>>>()?;
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let predictions = self.member_predictions(x)?;
        Self::predict_from_predictions(&predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{DecisionTree, KNNClassifier};
    use ndarray::array;

    #[test]
    fn test_majority_vote() {
        let preds = vec![
            array![0.0, 1.0, 1.0, 0.0],
            array![0.0, 0.0, 1.0, 1.0],
            array![1.0, 1.0, 1.0, 1.0],
        ];
        let result = VotingClassifier::predict_from_predictions(&preds).unwrap();
        assert_eq!(result, array![0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tie_goes_to_smallest_label() {
        // three members, three different labels
        let preds = vec![array![2.0, 0.0], array![1.0, 2.0], array![0.0, 1.0]];
        let result = VotingClassifier::predict_from_predictions(&preds).unwrap();
        assert_eq!(result, array![0.0, 0.0]);

        // two members disagreeing, in either order
        let preds = vec![array![1.0, 0.0], array![0.0, 1.0]];
        let result = VotingClassifier::predict_from_predictions(&preds).unwrap();
        assert_eq!(result, array![0.0, 0.0]);

        // a strict majority still wins over a smaller label
        let preds = vec![array![0.0], array![2.0], array![2.0], array![1.0]];
        let result = VotingClassifier::predict_from_predictions(&preds).unwrap();
        assert_eq!(result, array![2.0]);
    }

    #[test]
    fn test_empty_and_ragged_predictions() {
        assert!(VotingClassifier::predict_from_predictions(&[]).is_err());
        let preds = vec![array![0.0, 1.0], array![0.0]];
        assert!(VotingClassifier::predict_from_predictions(&preds).is_err());
    }

    #[test]
    fn test_fit_predict_members() {
        let x = Array2::from_shape_vec((8, 1), vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]).unwrap();
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut voting = VotingClassifier::new()
            .with_estimator("dt", DecisionTree::new().with_max_depth(2))
            .with_estimator("knn", KNNClassifier::with_k(3));
        voting.fit(&x, &y).unwrap();

        assert_eq!(voting.names(), vec!["dt", "knn"]);
        assert_eq!(voting.predict(&x).unwrap(), y);
        assert_eq!(voting.member_predictions(&x).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let x = Array2::zeros((4, 1));
        let y = array![0.0, 1.0, 0.0, 1.0];
        let mut voting = VotingClassifier::new()
            .with_estimator("dt", DecisionTree::new())
            .with_estimator("dt", DecisionTree::new());
        assert!(voting.fit(&x, &y).is_err());
        assert!(VotingClassifier::new().fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let voting = VotingClassifier::new().with_estimator("dt", DecisionTree::new());
        assert!(matches!(voting.predict(&Array2::zeros((1, 1))), Err(BenchError::ModelNotFitted)));
    }
}
