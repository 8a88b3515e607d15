//! Benchmark pipeline: load data, build classifier specs, tune each one

use std::time::Instant;

use tracing::{debug, info};

use super::report::{BenchReport, ClassifierReport, TunedModels};
use crate::config::BenchConfig;
use crate::data::{load_breast_cancer, train_test_split, Dataset, Split};
use crate::error::Result;
use crate::optimizer::{
    DecisionTreeSpec, EstimatorSpec, GridSearch, KnnSpec, ParamSet, SvmSpec, VotingSpec,
};
use crate::tracking::{ExperimentTracker, ParamSink};
use crate::training::Model;

pub const DT_TITLE: &str = "Decision Tree:";
pub const KNN_TITLE: &str = "K-nearest neighbors:";
pub const SVM_TITLE: &str = "Support vector machines:";
pub const VOTING_TITLE: &str = "Voting Classifier";

/// Dataset together with its train/test split
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub split: Split,
}

/// The three base specs and the voting spec over them
#[derive(Debug, Clone)]
pub struct ClassifierSuite {
    pub dt: DecisionTreeSpec,
    pub knn: KnnSpec,
    pub svm: SvmSpec,
    pub voting: VotingSpec,
}

/// Load the configured dataset and split it with the shared seed
pub fn load_data(config: &BenchConfig) -> Result<LoadedData> {
    let dataset = load_breast_cancer(&config.dataset)?;
    let split = train_test_split(&dataset, config.test_size, config.seed)?;
    info!(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        n_train = split.n_train(),
        n_test = split.n_test(),
        seed = config.seed,
        "Loaded dataset"
    );
    Ok(LoadedData { dataset, split })
}

/// Base specs seeded with `seed`, plus the voting spec referencing them
pub fn classifiers(seed: u64) -> ClassifierSuite {
    let dt = DecisionTreeSpec::new(seed);
    let knn = KnnSpec::default();
    let svm = SvmSpec::default();
    let voting = VotingSpec::new(dt.clone(), knn.clone(), svm.clone());
    debug!(members = ?voting.member_names(), "Built classifier specs");
    ClassifierSuite { dt, knn, svm, voting }
}

/// Tune one spec on the training split and score the refitted winner
fn tune<S: EstimatorSpec>(
    search: &GridSearch,
    spec: &S,
    title: &str,
    split: &Split,
) -> Result<(ClassifierReport, S::Model)> {
    let outcome = search.fit(spec, &split.x_train, &split.y_train)?;
    let train_acc = outcome.model.score(&split.x_train, &split.y_train)?;
    let test_acc = outcome.model.score(&split.x_test, &split.y_test)?;

    let report = ClassifierReport {
        name: spec.name().to_string(),
        title: title.to_string(),
        best_params: outcome.best_params.pairs(),
        best_score: outcome.best_score,
        train_acc,
        test_acc,
        n_candidates: outcome.candidates.len(),
    };
    Ok((report, outcome.model))
}

/// Tune the decision tree, k-NN, SVM and voting ensemble in that order.
///
/// Best params and accuracies of the three base classifiers go to `sink`;
/// the ensemble is only printed. Progress lines go to stdout.
pub fn grid_search(
    data: &LoadedData,
    suite: &ClassifierSuite,
    sink: &mut impl ParamSink,
    folds: usize,
) -> Result<BenchReport> {
    let search = GridSearch::new(folds);
    let split = &data.split;

    println!("{}", DT_TITLE);
    let (dt_report, dt) = tune(&search, &suite.dt, DT_TITLE, split)?;
    dt_report.record(sink)?;
    println!("{}", dt_report.accuracy_lines());

    println!("\n{}", KNN_TITLE);
    let (knn_report, knn) = tune(&search, &suite.knn, KNN_TITLE, split)?;
    knn_report.record(sink)?;
    println!("{}", knn_report.accuracy_lines());

    println!("\n{}", SVM_TITLE);
    let (svm_report, svm) = tune(&search, &suite.svm, SVM_TITLE, split)?;
    svm_report.record(sink)?;
    println!("{}", svm_report.accuracy_lines());

    println!("\n{}", VOTING_TITLE);
    let (voting_report, voting) = tune(&search, &suite.voting, VOTING_TITLE, split)?;
    println!("{}", voting_report.accuracy_lines());

    Ok(BenchReport {
        classifiers: vec![dt_report, knn_report, svm_report, voting_report],
        models: TunedModels { dt, knn, svm, voting },
    })
}

/// Runs the whole benchmark inside one tracked run
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    config: BenchConfig,
}

impl ExperimentRunner {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Create the experiment, then load, build and tune inside a run named
    /// after the config. The run ends `FAILED` if any stage fails.
    pub fn run(&self) -> Result<BenchReport> {
        self.config.validate()?;
        let start = Instant::now();

        let mut tracker = ExperimentTracker::from_uri(&self.config.tracking_uri)?;
        info!(
            location = %tracker.location(),
            experiment = %self.config.experiment_name,
            "Using tracking store"
        );

        let experiment_id = if self.config.reuse_experiment {
            tracker.get_or_create_experiment(&self.config.experiment_name)?
        } else {
            tracker.create_experiment(&self.config.experiment_name)?
        };

        let seed = self.config.seed;
        let folds = self.config.cv_folds;
        let report = tracker.with_run(&experiment_id, &self.config.run_name, |tracker| {
            let data = load_data(&self.config)?;
            let suite = classifiers(seed);
            grid_search(&data, &suite, tracker, folds)
        })?;

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            run = %self.config.run_name,
            "Benchmark finished"
        );
        Ok(report)
    }
}
