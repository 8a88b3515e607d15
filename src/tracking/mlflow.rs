//! MLflow tracking server backend (REST API 2.0)

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{Metric, RunStatus, TrackingBackend};
use crate::error::{BenchError, Result};

const API_PREFIX: &str = "api/2.0/mlflow";

/// MLflow tracking server reached over HTTP
#[derive(Debug, Clone)]
pub struct MlflowRest {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunPayload,
}

#[derive(Debug, Deserialize)]
struct RunPayload {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

/// A failed API call
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl ApiError {
    fn into_bench_error(self, endpoint: &str) -> BenchError {
        BenchError::HttpError(format!(
            "{} returned {} {}: {}",
            endpoint, self.status, self.error_code, self.message
        ))
    }
}

impl MlflowRest {
    /// Client for the server at `base_url` (`http://host:port`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    fn decode<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<std::result::Result<T, ApiError>> {
        let status = response.status();
        let text = response.text()?;
        if status.is_success() {
            let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
            return Ok(Ok(serde_json::from_str(body)?));
        }
        let err: ErrorBody = serde_json::from_str(&text).unwrap_or(ErrorBody {
            error_code: String::new(),
            message: text,
        });
        Ok(Err(ApiError {
            status,
            error_code: err.error_code,
            message: err.message,
        }))
    }

    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<std::result::Result<T, ApiError>> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send()?;
        Self::decode(response)
    }

    /// POST that must succeed
    fn call<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.post(path, body)?.map_err(|e| e.into_bench_error(path))
    }
}

impl TrackingBackend for MlflowRest {
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>> {
        let path = "experiments/get-by-name";
        let url = self.endpoint(path);
        debug!(url = %url, name, "GET");
        let response = self
            .client
            .get(&url)
            .query(&[("experiment_name", name)])
            .send()?;

        match Self::decode::<GetExperimentResponse>(response)? {
            Ok(found) => Ok(Some(found.experiment.experiment_id)),
            Err(e) if e.error_code == "RESOURCE_DOES_NOT_EXIST" || e.status == StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(e) => Err(e.into_bench_error(path)),
        }
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        let path = "experiments/create";
        match self.post::<CreateExperimentResponse>(path, &json!({ "name": name }))? {
            Ok(created) => Ok(created.experiment_id),
            Err(e) if e.error_code == "RESOURCE_ALREADY_EXISTS" => {
                Err(BenchError::ExperimentExists(name.to_string()))
            }
            Err(e) => Err(e.into_bench_error(path)),
        }
    }

    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String> {
        let created: CreateRunResponse = self.call(
            "runs/create",
            &json!({
                "experiment_id": experiment_id,
                "run_name": run_name,
                "start_time": start_time,
                "tags": [{ "key": "mlflow.runName", "value": run_name }],
            }),
        )?;
        Ok(created.run.info.run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: Value = self.call(
            "runs/log-parameter",
            &json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        let _: Value = self.call(
            "runs/log-metric",
            &json!({
                "run_id": run_id,
                "key": metric.key,
                "value": metric.value,
                "timestamp": metric.timestamp,
                "step": metric.step,
            }),
        )?;
        Ok(())
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let _: Value = self.call(
            "runs/update",
            &json!({ "run_id": run_id, "status": status.as_str(), "end_time": end_time }),
        )?;
        Ok(())
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}
