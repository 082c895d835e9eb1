//! Engine and runtime configuration settings

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_QUEUE_CAPACITY;

/// Prediction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding one JSON file per prediction
    #[serde(default = "default_predictions_dir")]
    pub predictions_dir: PathBuf,

    /// Pending predictions the queue holds before submitters wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Value written to each record's `source` field
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_predictions_dir() -> PathBuf {
    PathBuf::from("predictions")
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_source() -> String {
    "local-api".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            predictions_dir: default_predictions_dir(),
            queue_capacity: default_queue_capacity(),
            source: default_source(),
        }
    }
}

/// A host directory mounted into every model container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub source: String,
    pub destination: String,
}

/// Container runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Docker CLI binary
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,

    /// Port the model server listens on inside the container
    #[serde(default = "default_container_port")]
    pub container_port: u16,

    /// Interval between readiness probes while a container starts
    #[serde(default = "default_ready_poll_ms")]
    pub ready_poll_ms: u64,

    /// Volumes attached to every started container
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_container_port() -> u16 {
    5000
}

fn default_ready_poll_ms() -> u64 {
    500
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
            container_port: default_container_port(),
            ready_poll_ms: default_ready_poll_ms(),
            volumes: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
}
