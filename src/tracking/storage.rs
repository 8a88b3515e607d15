//! Local file system tracking store
//!
//! All experiments live in one `experiments.json` under the base directory.
//! Every operation reads, updates and rewrites the file under a process-wide
//! lock held by the store.
//!
//! The layout is this crate's own and cannot be read by the MLflow UI; point
//! the tracking URI at an MLflow server to use it.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{now_millis, Experiment, Metric, Run, RunStatus, TrackingBackend};
use crate::error::{BenchError, Result};

/// Local file system storage backend
#[derive(Debug)]
pub struct LocalStorage {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new local storage backend, creating the directory if needed
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    /// Load experiments from storage
    pub fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let file_path = self.experiments_file();
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&file_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save experiments to storage
    pub fn save_experiments(&self, experiments: &[Experiment]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let json = serde_json::to_string_pretty(experiments)?;

        // replace atomically
        let tmp = self.base_dir.join("experiments.json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.experiments_file())?;
        Ok(())
    }

    /// The run with `run_name` in experiment `experiment_name`, most recent first
    pub fn find_run(&self, experiment_name: &str, run_name: &str) -> Result<Option<Run>> {
        let experiments = self.load_experiments()?;
        Ok(experiments
            .into_iter()
            .find(|e| e.name == experiment_name)
            .and_then(|e| e.runs.into_iter().rev().find(|r| r.run_name == run_name)))
    }

    /// Apply `f` to the run with `run_id` and persist the result
    fn update_run_with<F>(&self, run_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Run) -> Result<()>,
    {
        let _guard = self.lock.lock();
        let mut experiments = self.load_experiments()?;
        let run = experiments
            .iter_mut()
            .flat_map(|e| e.runs.iter_mut())
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| BenchError::TrackingError(format!("unknown run id {}", run_id)))?;
        f(run)?;
        self.save_experiments(&experiments)
    }
}

impl TrackingBackend for LocalStorage {
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self
            .load_experiments()?
            .into_iter()
            .find(|e| e.name == name)
            .map(|e| e.experiment_id))
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        let _guard = self.lock.lock();
        let mut experiments = self.load_experiments()?;
        if experiments.iter().any(|e| e.name == name) {
            return Err(BenchError::ExperimentExists(name.to_string()));
        }

        let experiment_id = Uuid::new_v4().simple().to_string();
        experiments.push(Experiment {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
            created_at: now_millis(),
            runs: Vec::new(),
        });
        self.save_experiments(&experiments)?;
        debug!(experiment_id = %experiment_id, name, "Created experiment");
        Ok(experiment_id)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String> {
        let _guard = self.lock.lock();
        let mut experiments = self.load_experiments()?;
        let experiment = experiments
            .iter_mut()
            .find(|e| e.experiment_id == experiment_id)
            .ok_or_else(|| {
                BenchError::TrackingError(format!("unknown experiment id {}", experiment_id))
            })?;

        let run_id = Uuid::new_v4().simple().to_string();
        experiment.runs.push(Run {
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            start_time,
            end_time: None,
            status: RunStatus::Running,
            params: Default::default(),
            metrics: Default::default(),
        });
        self.save_experiments(&experiments)?;
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update_run_with(run_id, |run| {
            if let Some(existing) = run.params.get(key) {
                if existing != value {
                    return Err(BenchError::TrackingError(format!(
                        "param '{}' already logged with value '{}', refusing '{}'",
                        key, existing, value
                    )));
                }
                return Ok(());
            }
            run.params.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        self.update_run_with(run_id, |run| {
            run.metrics
                .entry(metric.key.clone())
                .or_default()
                .push(metric.clone());
            Ok(())
        })
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        self.update_run_with(run_id, |run| {
            run.status = status;
            run.end_time = Some(end_time);
            Ok(())
        })
    }

    fn location(&self) -> String {
        self.base_dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_storage_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        let id = storage.create_experiment("Test Experiment").unwrap();
        assert!(storage.experiments_file().exists());

        let loaded = storage.load_experiments().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].experiment_id, id);
        assert_eq!(loaded[0].name, "Test Experiment");
    }

    #[test]
    fn test_duplicate_experiment() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        storage.create_experiment("ensamble_2").unwrap();
        let err = storage.create_experiment("ensamble_2").unwrap_err();
        assert!(matches!(err, BenchError::ExperimentExists(name) if name == "ensamble_2"));
        assert!(storage.get_experiment_by_name("ensamble_2").unwrap().is_some());
        assert!(storage.get_experiment_by_name("other").unwrap().is_none());
    }

    #[test]
    fn test_run_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();
        let exp = storage.create_experiment("e").unwrap();
        let run = storage.create_run(&exp, "r", 1).unwrap();

        storage.log_param(&run, "svm_best_kernel", "rbf").unwrap();
        storage.log_param(&run, "svm_best_kernel", "rbf").unwrap();
        assert!(storage.log_param(&run, "svm_best_kernel", "linear").is_err());

        let metric = Metric { key: "svm_test_acc".into(), value: 0.95, timestamp: 2, step: 0 };
        storage.log_metric(&run, &metric).unwrap();
        storage.update_run(&run, RunStatus::Finished, 3).unwrap();

        let stored = storage.find_run("e", "r").unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Finished);
        assert_eq!(stored.end_time, Some(3));
        assert_eq!(stored.params.len(), 1);
        assert_eq!(stored.latest_metric("svm_test_acc"), Some(0.95));
    }

    #[test]
    fn test_unknown_run() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();
        assert!(storage.log_param("nope", "k", "v").is_err());
        assert!(storage.create_run("nope", "r", 0).is_err());
    }
}
