//! Exhaustive grid search with cross-validation

use super::search_space::{
    DecisionTreeGrid, DecisionTreeParams, KnnGrid, KnnParams, ParamSet, SvmGrid, SvmParams,
    VotingGrid, VotingParams,
};
use crate::ensemble::VotingClassifier;
use crate::error::{BenchError, Result};
use crate::training::{
    accuracy, CVResults, CVSplit, CVStrategy, CrossValidator, DecisionTree, KNNClassifier,
    KNNConfig, Model, SVMClassifier, SVMConfig,
};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Training and validation rows of one CV fold
#[derive(Debug, Clone)]
pub struct FoldData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_valid: Array2<f64>,
    pub y_valid: Array1<f64>,
}

impl FoldData {
    fn from_split(x: &Array2<f64>, y: &Array1<f64>, split: &CVSplit) -> Self {
        Self {
            x_train: x.select(Axis(0), &split.train_indices),
            y_train: y.select(Axis(0), &split.train_indices),
            x_valid: x.select(Axis(0), &split.test_indices),
            y_valid: y.select(Axis(0), &split.test_indices),
        }
    }
}

/// A named model type with its hyperparameter grid
pub trait EstimatorSpec: Sync {
    type Params: ParamSet;
    type Model: Model;

    /// Short name, also the prefix of logged keys
    fn name(&self) -> &str;

    /// Candidates in enumeration order
    fn grid(&self) -> Vec<Self::Params>;

    /// Unfitted model for a candidate
    fn build(&self, params: &Self::Params) -> Self::Model;

    /// Validation predictions indexed `[candidate][fold]`.
    ///
    /// Fits every candidate on every fold in parallel.
    fn fold_predictions(
        &self,
        folds: &[FoldData],
        candidates: &[Self::Params],
    ) -> Result<Vec<Vec<Array1<f64>>>> {
        let jobs: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let predictions = jobs
            .par_iter()
            .map(|&(c, f)| {
                let fold = &folds[f];
                let mut model = self.build(&candidates[c]);
                model.fit(&fold.x_train, &fold.y_train)?;
                model.predict(&fold.x_valid)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut iter = predictions.into_iter();
        Ok((0..candidates.len())
            .map(|_| iter.by_ref().take(folds.len()).collect())
            .collect())
    }
}

/// CV scores of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult<P> {
    pub params: P,
    pub cv: CVResults,
}

/// Outcome of a search: the winning candidate refitted on all training data
#[derive(Debug)]
pub struct SearchOutcome<P, M> {
    pub best_index: usize,
    pub best_params: P,
    pub best_score: f64,
    pub candidates: Vec<CandidateResult<P>>,
    pub model: M,
}

/// Grid search over an [`EstimatorSpec`]
#[derive(Debug, Clone)]
pub struct GridSearch {
    cv: CrossValidator,
}

impl GridSearch {
    /// Stratified, unshuffled `n_folds`-fold search
    pub fn new(n_folds: usize) -> Self {
        Self::with_cv(CVStrategy::stratified(n_folds))
    }

    pub fn with_cv(strategy: CVStrategy) -> Self {
        Self {
            cv: CrossValidator::new(strategy),
        }
    }

    /// Score every candidate by mean validation accuracy, keep the first best,
    /// and refit it on `(x, y)`
    pub fn fit<S: EstimatorSpec>(
        &self,
        spec: &S,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SearchOutcome<S::Params, S::Model>> {
        let start = Instant::now();
        let candidates = spec.grid();
        if candidates.is_empty() {
            return Err(BenchError::ConfigError(format!(
                "{} has an empty parameter grid",
                spec.name()
            )));
        }

        let splits = self.cv.split(x.nrows(), Some(y))?;
        let folds: Vec<FoldData> = splits
            .iter()
            .map(|s| FoldData::from_split(x, y, s))
            .collect();
        debug!(
            estimator = spec.name(),
            n_candidates = candidates.len(),
            n_folds = folds.len(),
            "Starting grid search"
        );

        let predictions = spec.fold_predictions(&folds, &candidates)?;

        let mut results = Vec::with_capacity(candidates.len());
        for (params, preds) in candidates.into_iter().zip(predictions) {
            let scores = folds
                .iter()
                .zip(preds.iter())
                .map(|(fold, pred)| accuracy(&fold.y_valid, pred))
                .collect::<Result<Vec<f64>>>()?;
            results.push(CandidateResult {
                params,
                cv: CVResults::from_scores(scores),
            });
        }

        let mut best_index = 0;
        for (i, r) in results.iter().enumerate() {
            if r.cv.mean_score > results[best_index].cv.mean_score {
                best_index = i;
            }
        }
        let best_params = results[best_index].params.clone();
        let best_score = results[best_index].cv.mean_score;

        let mut model = spec.build(&best_params);
        model.fit(x, y)?;

        info!(
            estimator = spec.name(),
            best = %best_params.describe(),
            best_score,
            n_candidates = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Grid search finished"
        );

        Ok(SearchOutcome {
            best_index,
            best_params,
            best_score,
            candidates: results,
            model,
        })
    }
}

// ============================================================================
// Specs
// ============================================================================

/// Decision tree with the shared seed
#[derive(Debug, Clone)]
pub struct DecisionTreeSpec {
    pub grid: DecisionTreeGrid,
    pub random_state: u64,
}

impl DecisionTreeSpec {
    pub fn new(random_state: u64) -> Self {
        Self {
            grid: DecisionTreeGrid::default(),
            random_state,
        }
    }
}

impl EstimatorSpec for DecisionTreeSpec {
    type Params = DecisionTreeParams;
    type Model = DecisionTree;

    fn name(&self) -> &str {
        "dt"
    }

    fn grid(&self) -> Vec<DecisionTreeParams> {
        self.grid.candidates()
    }

    fn build(&self, params: &DecisionTreeParams) -> DecisionTree {
        DecisionTree::new()
            .with_criterion(params.criterion)
            .with_max_depth(params.max_depth)
            .with_random_state(self.random_state)
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnnSpec {
    pub grid: KnnGrid,
}

impl EstimatorSpec for KnnSpec {
    type Params = KnnParams;
    type Model = KNNClassifier;

    fn name(&self) -> &str {
        "knn"
    }

    fn grid(&self) -> Vec<KnnParams> {
        self.grid.candidates()
    }

    fn build(&self, params: &KnnParams) -> KNNClassifier {
        KNNClassifier::new(KNNConfig {
            n_neighbors: params.n_neighbors,
            algorithm: params.algorithm,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SvmSpec {
    pub grid: SvmGrid,
    pub config: SVMConfig,
}

impl EstimatorSpec for SvmSpec {
    type Params = SvmParams;
    type Model = SVMClassifier;

    fn name(&self) -> &str {
        "svm"
    }

    fn grid(&self) -> Vec<SvmParams> {
        self.grid.candidates()
    }

    fn build(&self, params: &SvmParams) -> SVMClassifier {
        SVMClassifier::new(self.config.clone()).with_kernel(params.kernel)
    }
}

/// Hard-voting ensemble over the three base specs
#[derive(Debug, Clone)]
pub struct VotingSpec {
    pub dt: DecisionTreeSpec,
    pub knn: KnnSpec,
    pub svm: SvmSpec,
}

impl VotingSpec {
    pub fn new(dt: DecisionTreeSpec, knn: KnnSpec, svm: SvmSpec) -> Self {
        Self { dt, knn, svm }
    }

    /// Member names in voting order
    pub fn member_names(&self) -> [&str; 3] {
        [self.dt.name(), self.knn.name(), self.svm.name()]
    }
}

fn distinct<P: PartialEq + Clone>(items: impl Iterator<Item = P>) -> Vec<P> {
    let mut out: Vec<P> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn position_of<P: ParamSet>(grid: &[P], params: &P) -> Result<usize> {
    grid.iter().position(|p| p == params).ok_or_else(|| {
        BenchError::TrainingError(format!("member candidate {:?} has no cached predictions", params))
    })
}

impl EstimatorSpec for VotingSpec {
    type Params = VotingParams;
    type Model = VotingClassifier;

    fn name(&self) -> &str {
        "voting"
    }

    fn grid(&self) -> Vec<VotingParams> {
        VotingGrid {
            dt: self.dt.grid.clone(),
            knn: self.knn.grid.clone(),
            svm: self.svm.grid.clone(),
        }
        .candidates()
    }

    fn build(&self, params: &VotingParams) -> VotingClassifier {
        VotingClassifier::new()
            .with_estimator(self.dt.name(), self.dt.build(&params.dt))
            .with_estimator(self.knn.name(), self.knn.build(&params.knn))
            .with_estimator(self.svm.name(), self.svm.build(&params.svm))
    }

    /// Members are fitted once per distinct setting and fold; every ensemble
    /// candidate is then scored by voting over those predictions.
    fn fold_predictions(
        &self,
        folds: &[FoldData],
        candidates: &[VotingParams],
    ) -> Result<Vec<Vec<Array1<f64>>>> {
        let dt_grid = distinct(candidates.iter().map(|c| c.dt));
        let knn_grid = distinct(candidates.iter().map(|c| c.knn));
        let svm_grid = distinct(candidates.iter().map(|c| c.svm));

        let dt_preds = self.dt.fold_predictions(folds, &dt_grid)?;
        let knn_preds = self.knn.fold_predictions(folds, &knn_grid)?;
        let svm_preds = self.svm.fold_predictions(folds, &svm_grid)?;
        debug!(
            member_fits = (dt_grid.len() + knn_grid.len() + svm_grid.len()) * folds.len(),
            "Cached member fold predictions"
        );

        candidates
            .par_iter()
            .map(|c| {
                let i = position_of(&dt_grid, &c.dt)?;
                let j = position_of(&knn_grid, &c.knn)?;
                let k = position_of(&svm_grid, &c.svm)?;
                (0..folds.len())
                    .map(|f| {
                        VotingClassifier::predict_from_predictions(&[
                            dt_preds[i][f].clone(),
                            knn_preds[j][f].clone(),
                            svm_preds[k][f].clone(),
                        ])
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{Criterion, KernelKind, NeighborAlgorithm};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    /// Two noisy gaussian blobs
    fn blobs(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let label = (i % 2) as f64;
            let center = if label == 0.0 { 0.0 } else { 3.0 };
            x[[i, 0]] = center + rng.gen_range(-2.0..2.0);
            x[[i, 1]] = center + rng.gen_range(-2.0..2.0);
            y[i] = label;
        }
        (x, y)
    }

    #[test]
    fn test_best_is_from_grid_and_first_on_ties() {
        let (x, y) = blobs(80, 3);
        let spec = DecisionTreeSpec::new(42);
        let outcome = GridSearch::new(5).fit(&spec, &x, &y).unwrap();

        assert_eq!(outcome.candidates.len(), 6);
        assert!(spec.grid().contains(&outcome.best_params));
        assert_eq!(outcome.best_params, outcome.candidates[outcome.best_index].params);

        let max = outcome
            .candidates
            .iter()
            .map(|c| c.cv.mean_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let first_max = outcome.candidates.iter().position(|c| c.cv.mean_score == max).unwrap();
        assert_eq!(outcome.best_index, first_max);
        assert_eq!(outcome.best_score, max);
    }

    #[test]
    fn test_search_is_reproducible() {
        let (x, y) = blobs(60, 5);
        let spec = KnnSpec::default();
        let a = GridSearch::new(5).fit(&spec, &x, &y).unwrap();
        let b = GridSearch::new(5).fit(&spec, &x, &y).unwrap();

        assert_eq!(a.best_params, b.best_params);
        let scores_a: Vec<f64> = a.candidates.iter().map(|c| c.cv.mean_score).collect();
        let scores_b: Vec<f64> = b.candidates.iter().map(|c| c.cv.mean_score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn test_knn_algorithms_score_identically() {
        let (x, y) = blobs(60, 9);
        let outcome = GridSearch::new(5).fit(&KnnSpec::default(), &x, &y).unwrap();

        for k in [3, 5, 10] {
            let scores: Vec<f64> = outcome
                .candidates
                .iter()
                .filter(|c| c.params.n_neighbors == k)
                .map(|c| c.cv.mean_score)
                .collect();
            assert_eq!(scores.len(), 3);
            assert!(scores.iter().all(|&s| s == scores[0]), "k={} scores differ: {:?}", k, scores);
        }
        // ball_tree is listed first, so it wins among equals
        assert_eq!(outcome.best_params.algorithm, NeighborAlgorithm::BallTree);
    }

    #[test]
    fn test_cached_voting_matches_direct_fits() {
        let (x, y) = blobs(50, 11);
        let spec = VotingSpec::new(
            DecisionTreeSpec {
                grid: DecisionTreeGrid { criterion: vec![Criterion::Gini], max_depth: vec![1, 3] },
                random_state: 42,
            },
            KnnSpec { grid: KnnGrid { algorithm: vec![NeighborAlgorithm::Brute], n_neighbors: vec![1, 5] } },
            SvmSpec { grid: SvmGrid { kernel: vec![KernelKind::Linear, KernelKind::Rbf] }, ..Default::default() },
        );

        let splits = CrossValidator::new(CVStrategy::stratified(5)).split(x.nrows(), Some(&y)).unwrap();
        let folds: Vec<FoldData> = splits.iter().map(|s| FoldData::from_split(&x, &y, s)).collect();
        let candidates = spec.grid();
        assert_eq!(candidates.len(), 8);

        let cached = spec.fold_predictions(&folds, &candidates).unwrap();
        for (c, params) in candidates.iter().enumerate() {
            for (f, fold) in folds.iter().enumerate() {
                let mut direct = spec.build(params);
                direct.fit(&fold.x_train, &fold.y_train).unwrap();
                assert_eq!(direct.predict(&fold.x_valid).unwrap(), cached[c][f]);
            }
        }
    }

    #[test]
    fn test_refit_on_full_training_data() {
        let (x, y) = blobs(40, 13);
        let spec = SvmSpec {
            grid: SvmGrid { kernel: vec![KernelKind::Rbf] },
            ..Default::default()
        };
        let outcome = GridSearch::new(4).fit(&spec, &x, &y).unwrap();
        assert_eq!(outcome.best_params, SvmParams { kernel: KernelKind::Rbf });
        assert_eq!(outcome.model.predict(&x).unwrap().len(), 40);
    }

    #[test]
    fn test_empty_grid() {
        let (x, y) = blobs(20, 1);
        let spec = SvmSpec { grid: SvmGrid { kernel: vec![] }, ..Default::default() };
        assert!(matches!(GridSearch::new(2).fit(&spec, &x, &y), Err(BenchError::ConfigError(_))));
    }
}
