//! Integration test: experiment tracking against the local store

use ensemble_bench::config::{BenchConfig, DatasetSource};
use ensemble_bench::error::BenchError;
use ensemble_bench::experiment::ExperimentRunner;
use ensemble_bench::tracking::{ExperimentTracker, LocalStorage, ParamSink, RunStatus};

#[test]
fn test_run_records_params_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = ExperimentTracker::from_uri(dir.path().to_str().unwrap()).unwrap();
    let experiment_id = tracker.create_experiment("ensamble_2").unwrap();

    tracker
        .with_run(&experiment_id, "test_ensemble_1", |t| {
            t.log_param("dt_best_criterion", "entropy")?;
            t.log_param("dt_best_max_depth", "3")?;
            ParamSink::log_metric(t, "dt_train_acc", 0.98)?;
            ParamSink::log_metric(t, "dt_test_acc", 0.95)
        })
        .unwrap();

    let store = LocalStorage::new(dir.path()).unwrap();
    let experiments = store.load_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].runs.len(), 1);

    let run = &experiments[0].runs[0];
    assert_eq!(run.run_name, "test_ensemble_1");
    assert_eq!(run.status, RunStatus::Finished);
    assert!(run.end_time.unwrap() >= run.start_time);
    assert_eq!(run.params["dt_best_criterion"], "entropy");
    assert_eq!(run.params["dt_best_max_depth"], "3");
    assert_eq!(run.latest_metric("dt_train_acc"), Some(0.98));
    assert_eq!(run.latest_metric("dt_test_acc"), Some(0.95));
}

#[test]
fn test_duplicate_experiment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();

    tracker.create_experiment("ensamble_2").unwrap();
    let err = tracker.create_experiment("ensamble_2").unwrap_err();
    assert!(matches!(err, BenchError::ExperimentExists(_)));
}

#[test]
fn test_param_values_are_immutable() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::with_dir(dir.path()).unwrap();
    let exp = tracker.create_experiment("e").unwrap();
    tracker.start_run(&exp, "r").unwrap();

    tracker.log_param("svm_best_kernel", "rbf").unwrap();
    assert!(matches!(
        tracker.log_param("svm_best_kernel", "linear"),
        Err(BenchError::TrackingError(_))
    ));
    tracker.end_run(RunStatus::Finished).unwrap();
}

fn failing_config(dir: &std::path::Path) -> BenchConfig {
    BenchConfig::default()
        .with_tracking_uri(dir.join("bench-runs").display().to_string())
        .with_experiment("ensamble_2")
        .with_run_name("test_ensemble_1")
        .with_reuse_experiment(false)
        .with_dataset(DatasetSource::Csv(dir.join("missing.csv")))
}

#[test]
fn test_failed_pipeline_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let config = failing_config(dir.path());

    let result = ExperimentRunner::new(config).run();
    assert!(result.is_err());

    let store = LocalStorage::new(dir.path().join("bench-runs")).unwrap();
    let run = store.find_run("ensamble_2", "test_ensemble_1").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.params.is_empty());
}

#[test]
fn test_runner_refuses_existing_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let config = failing_config(dir.path());

    assert!(ExperimentRunner::new(config.clone()).run().is_err());
    let err = ExperimentRunner::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, BenchError::ExperimentExists(_)));

    // reusing gets past experiment creation and into a second run
    let err = ExperimentRunner::new(config.with_reuse_experiment(true))
        .run()
        .unwrap_err();
    assert!(!matches!(err, BenchError::ExperimentExists(_)));

    let store = LocalStorage::new(dir.path().join("bench-runs")).unwrap();
    let experiments = store.load_experiments().unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].runs.len(), 2);
}

#[test]
fn test_invalid_config_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = failing_config(dir.path()).with_cv_folds(1);

    let err = ExperimentRunner::new(config).run().unwrap_err();
    assert!(matches!(err, BenchError::InvalidParameter { .. }));
    assert!(!dir.path().join("bench-runs").exists());
}
