//! Experiment tracking
//!
//! Experiments are named collections of runs; a run holds immutable string
//! parameters and timestamped metric series. [`ExperimentTracker`] is the
//! front-end, the store behind it is a [`TrackingBackend`]:
//! - [`LocalStorage`]: `experiments.json` under a directory
//! - [`MlflowRest`]: an MLflow tracking server over its REST API

mod mlflow;
mod storage;
mod tracker;

pub use mlflow::MlflowRest;
pub use storage::LocalStorage;
pub use tracker::ExperimentTracker;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub step: i64,
}

/// A run as kept by the local store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, Vec<Metric>>,
}

impl Run {
    /// Most recent value of a metric
    pub fn latest_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(|m| m.last()).map(|m| m.value)
    }
}

/// An experiment as kept by the local store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub runs: Vec<Run>,
}

/// Persistence behind [`ExperimentTracker`]
pub trait TrackingBackend: Send + Sync {
    /// Id of the experiment called `name`, if any
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>>;

    /// Create an experiment; fails with `ExperimentExists` when the name is taken
    fn create_experiment(&self, name: &str) -> Result<String>;

    /// Create a run in `Running` state and return its id
    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()>;

    /// Set the terminal status of a run
    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Where grid search results are recorded
pub trait ParamSink {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()>;

    fn log_metric(&mut self, key: &str, value: f64) -> Result<()>;
}

/// In-memory [`ParamSink`], useful in tests and dry runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySink {
    pub params: Vec<(String, String)>,
    pub metrics: Vec<(String, f64)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Number of params whose key starts with `prefix`
    pub fn count_params(&self, prefix: &str) -> usize {
        self.params.iter().filter(|(k, _)| k.starts_with(prefix)).count()
    }

    /// Number of metrics whose key starts with `prefix`
    pub fn count_metrics(&self, prefix: &str) -> usize {
        self.metrics.iter().filter(|(k, _)| k.starts_with(prefix)).count()
    }
}

impl ParamSink for MemorySink {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()> {
        self.params.push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        self.metrics.push((key.to_string(), value));
        Ok(())
    }
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
