//! Prediction records
//!
//! A record is created in `starting` when a request is accepted and is
//! completed at most once by the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;
use crate::runtime::{Inputs, PredictionOutput};

/// Lifecycle state of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Succeeded,
    Failed,
}

impl PredictionStatus {
    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionUrls {
    #[serde(default)]
    pub get: String,
    #[serde(default)]
    pub cancel: String,
}

/// Persisted state of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    #[serde(rename = "version")]
    pub version_id: String,
    #[serde(default)]
    pub urls: PredictionUrls,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub input: Inputs,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: String,
}

impl Prediction {
    /// New `starting` record with a fresh id
    pub fn new(version_id: &str, input: Inputs, source: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            urls: PredictionUrls {
                get: format!("/v1/predictions/{}", id),
                cancel: String::new(),
            },
            id,
            version_id: version_id.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            source: source.to_string(),
            status: PredictionStatus::Starting,
            input,
            output: None,
            error: None,
            logs: "starting...".to_string(),
        }
    }

    /// Record the outcome of running the model.
    ///
    /// Returns `false` and leaves the record untouched if it already
    /// reached a terminal state.
    pub fn complete(&mut self, result: Result<PredictionOutput, RuntimeError>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match result {
            Ok(out) => {
                self.status = PredictionStatus::Succeeded;
                self.output = Some(out.output);
                if let Some(logs) = out.logs {
                    self.logs = logs;
                }
            }
            Err(e) => {
                self.status = PredictionStatus::Failed;
                self.error = Some(e.to_string());
            }
        }
        self.completed_at = Some(Utc::now());
        true
    }
}
