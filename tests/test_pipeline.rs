//! Integration test: benchmark pipeline end-to-end

use std::sync::OnceLock;

use ensemble_bench::config::{BenchConfig, DatasetSource, DEFAULT_CV_FOLDS, DEFAULT_SEED};
use ensemble_bench::ensemble::VotingClassifier;
use ensemble_bench::experiment::{classifiers, grid_search, load_data, BenchReport, LoadedData};
use ensemble_bench::optimizer::{EstimatorSpec, GridSearch, ParamSet};
use ensemble_bench::tracking::MemorySink;
use ensemble_bench::training::Model;

fn config() -> BenchConfig {
    BenchConfig::default()
        .with_seed(DEFAULT_SEED)
        .with_test_size(0.3)
        .with_dataset(DatasetSource::Bundled)
}

/// One full run shared by the tests below
fn full_run() -> &'static (LoadedData, BenchReport, MemorySink) {
    static RUN: OnceLock<(LoadedData, BenchReport, MemorySink)> = OnceLock::new();
    RUN.get_or_init(|| {
        let data = load_data(&config()).unwrap();
        let suite = classifiers(DEFAULT_SEED);
        let mut sink = MemorySink::new();
        let report = grid_search(&data, &suite, &mut sink, DEFAULT_CV_FOLDS).unwrap();
        (data, report, sink)
    })
}

#[test]
fn test_split_sizes() {
    let data = load_data(&config()).unwrap();
    assert_eq!(data.dataset.n_samples(), 569);
    assert_eq!(data.dataset.n_features(), 30);
    assert_eq!(data.dataset.features[[0, 0]], 17.99);
    assert_eq!(data.dataset.features[[0, 3]], 1001.0);
    assert!((data.dataset.features.sum() - 1_056_474.459_635_6).abs() < 1e-4);
    assert_eq!(data.split.n_train(), 398);
    assert_eq!(data.split.n_test(), 171);
}

#[test]
fn test_same_seed_same_split() {
    let a = load_data(&config()).unwrap();
    let b = load_data(&config()).unwrap();
    assert_eq!(a.split.train_indices, b.split.train_indices);
    assert_eq!(a.split.test_indices, b.split.test_indices);

    let c = load_data(&config().with_seed(7)).unwrap();
    assert_ne!(a.split.test_indices, c.split.test_indices);
}

#[test]
fn test_same_seed_same_best_params() {
    let data = load_data(&config()).unwrap();
    let suite = classifiers(DEFAULT_SEED);
    let search = GridSearch::new(DEFAULT_CV_FOLDS);
    let (x, y) = (&data.split.x_train, &data.split.y_train);

    let dt_a = search.fit(&suite.dt, x, y).unwrap();
    let dt_b = search.fit(&suite.dt, x, y).unwrap();
    assert_eq!(dt_a.best_params, dt_b.best_params);
    assert_eq!(dt_a.best_score, dt_b.best_score);

    let knn_a = search.fit(&suite.knn, x, y).unwrap();
    let knn_b = search.fit(&suite.knn, x, y).unwrap();
    assert_eq!(knn_a.best_params, knn_b.best_params);
}

#[test]
fn test_four_classifiers_in_order() {
    let (_, report, _) = full_run();
    let names: Vec<&str> = report.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["dt", "knn", "svm", "voting"]);

    let candidates: Vec<usize> = report.iter().map(|c| c.n_candidates).collect();
    assert_eq!(candidates, vec![6, 9, 4, 216]);
}

#[test]
fn test_accuracies_in_expected_range() {
    let (_, report, _) = full_run();
    for c in report.iter() {
        assert!((0.0..=1.0).contains(&c.train_acc), "{} train acc {}", c.name, c.train_acc);
        assert!(
            (0.85..=1.0).contains(&c.test_acc),
            "{} test acc {} outside [0.85, 1.0]",
            c.name,
            c.test_acc
        );
    }
}

#[test]
fn test_best_params_come_from_grid() {
    let (_, report, _) = full_run();
    let suite = classifiers(DEFAULT_SEED);

    let in_grid = |name: &str, grid: Vec<Vec<(String, String)>>| {
        let best = &report.get(name).unwrap().best_params;
        assert!(grid.contains(best), "{} best {:?} not in grid", name, best);
    };
    in_grid("dt", suite.dt.grid().iter().map(|p| p.pairs()).collect());
    in_grid("knn", suite.knn.grid().iter().map(|p| p.pairs()).collect());
    in_grid("svm", suite.svm.grid().iter().map(|p| p.pairs()).collect());
    in_grid("voting", suite.voting.grid().iter().map(|p| p.pairs()).collect());
}

#[test]
fn test_voting_is_member_majority() {
    let (data, report, _) = full_run();
    let voting = &report.models.voting;
    assert_eq!(voting.names(), vec!["dt", "knn", "svm"]);

    let members = voting.member_predictions(&data.split.x_test).unwrap();
    let predicted = voting.predict(&data.split.x_test).unwrap();
    assert_eq!(
        predicted,
        VotingClassifier::predict_from_predictions(&members).unwrap()
    );

    for i in 0..predicted.len() {
        let (dt, knn, svm) = (members[0][i], members[1][i], members[2][i]);
        let majority = if knn == svm { knn } else { dt };
        assert_eq!(predicted[i], majority, "sample {}", i);
    }
}

#[test]
fn test_logged_keys() {
    let (_, report, sink) = full_run();

    assert_eq!(sink.count_params("dt_"), 2);
    assert_eq!(sink.count_params("knn_"), 2);
    assert_eq!(sink.count_params("svm_"), 1);
    assert_eq!(sink.count_params("voting"), 0);
    assert_eq!(sink.count_metrics("dt_"), 2);
    assert_eq!(sink.count_metrics("knn_"), 2);
    assert_eq!(sink.count_metrics("svm_"), 2);
    assert_eq!(sink.count_metrics("voting"), 0);

    for key in [
        "dt_best_criterion",
        "dt_best_max_depth",
        "knn_best_algorithm",
        "knn_best_n_neighbors",
        "svm_best_kernel",
    ] {
        assert!(sink.param(key).is_some(), "missing param {}", key);
    }

    let svm = report.get("svm").unwrap();
    assert_eq!(sink.metric("svm_train_acc"), Some(svm.train_acc));
    assert_eq!(sink.metric("svm_test_acc"), Some(svm.test_acc));
}

#[test]
fn test_refitted_models_reproduce_report() {
    let (data, report, _) = full_run();
    let dt = report.get("dt").unwrap();
    let score = report
        .models
        .dt
        .score(&data.split.x_test, &data.split.y_test)
        .unwrap();
    assert_eq!(score, dt.test_acc);
}
