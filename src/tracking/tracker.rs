//! Experiment tracker front-end

use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{now_millis, LocalStorage, Metric, MlflowRest, ParamSink, RunStatus, TrackingBackend};
use crate::error::{BenchError, Result};

#[derive(Debug, Clone)]
struct ActiveRun {
    run_id: String,
    run_name: String,
}

/// Records params and metrics of one active run at a time
pub struct ExperimentTracker {
    backend: Box<dyn TrackingBackend>,
    active: RwLock<Option<ActiveRun>>,
}

impl std::fmt::Debug for ExperimentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentTracker")
            .field("location", &self.backend.location())
            .field("active", &*self.active.read())
            .finish()
    }
}

impl ExperimentTracker {
    pub fn new(backend: Box<dyn TrackingBackend>) -> Self {
        Self {
            backend,
            active: RwLock::new(None),
        }
    }

    /// Tracker over a local directory store
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Box::new(LocalStorage::new(dir)?)))
    }

    /// Tracker for a tracking URI.
    ///
    /// `http://` and `https://` select an MLflow server; anything else is a
    /// local directory, optionally written as `file:<path>`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(BenchError::ConfigError("tracking uri is empty".to_string()));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(Self::new(Box::new(MlflowRest::new(uri)?)));
        }
        let path = uri
            .strip_prefix("file://")
            .or_else(|| uri.strip_prefix("file:"))
            .unwrap_or(uri);
        Self::with_dir(path)
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Create a new experiment; fails if the name is already taken
    pub fn create_experiment(&self, name: &str) -> Result<String> {
        let id = self.backend.create_experiment(name)?;
        info!(experiment = name, experiment_id = %id, "Created experiment");
        Ok(id)
    }

    /// Id of the experiment called `name`, creating it when missing
    pub fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        match self.backend.get_experiment_by_name(name)? {
            Some(id) => {
                debug!(experiment = name, experiment_id = %id, "Reusing experiment");
                Ok(id)
            }
            None => self.create_experiment(name),
        }
    }

    /// Open a run; only one run may be active
    pub fn start_run(&self, experiment_id: &str, run_name: &str) -> Result<String> {
        let mut active = self.active.write();
        if let Some(run) = active.as_ref() {
            return Err(BenchError::TrackingError(format!(
                "run '{}' is still active",
                run.run_name
            )));
        }
        let run_id = self.backend.create_run(experiment_id, run_name, now_millis())?;
        info!(run = run_name, run_id = %run_id, "Started run");
        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
        });
        Ok(run_id)
    }

    pub fn active_run_id(&self) -> Option<String> {
        self.active.read().as_ref().map(|r| r.run_id.clone())
    }

    fn require_run(&self) -> Result<String> {
        self.active_run_id().ok_or(BenchError::NoActiveRun)
    }

    pub fn log_param(&self, key: &str, value: &str) -> Result<()> {
        let run_id = self.require_run()?;
        debug!(key, value, "log_param");
        self.backend.log_param(&run_id, key, value)
    }

    pub fn log_metric(&self, key: &str, value: f64, step: i64) -> Result<()> {
        let run_id = self.require_run()?;
        debug!(key, value, step, "log_metric");
        self.backend.log_metric(
            &run_id,
            &Metric {
                key: key.to_string(),
                value,
                timestamp: now_millis(),
                step,
            },
        )
    }

    /// Close the active run with `status`
    pub fn end_run(&self, status: RunStatus) -> Result<()> {
        let run = self.active.write().take().ok_or(BenchError::NoActiveRun)?;
        self.backend.update_run(&run.run_id, status, now_millis())?;
        info!(run = %run.run_name, status = %status, "Ended run");
        Ok(())
    }

    /// Run `f` inside a fresh run, ending it `FINISHED` on success and
    /// `FAILED` on error. Errors from `f` take precedence over errors closing the run.
    pub fn with_run<T, F>(&mut self, experiment_id: &str, run_name: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.start_run(experiment_id, run_name)?;
        match f(self) {
            Ok(value) => {
                self.end_run(RunStatus::Finished)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(close_err) = self.end_run(RunStatus::Failed) {
                    warn!(error = %close_err, "Could not mark run as failed");
                }
                Err(e)
            }
        }
    }
}

impl ParamSink for ExperimentTracker {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()> {
        ExperimentTracker::log_param(self, key, value)
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        ExperimentTracker::log_metric(self, key, value, 0)
    }
}
