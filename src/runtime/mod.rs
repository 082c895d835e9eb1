//! Container runtime interface
//!
//! A model version runs as a container exposing a prediction server. The
//! engine only sees two seams:
//! - `ContainerBackend`: image lookup, pull, inspect and start
//! - `RunningModel`: a started container that can predict and be stopped

mod docker;

pub use docker::{DockerBackend, DockerModel};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::VolumeConfig;
use crate::error::RuntimeError;

/// Prediction input object, as submitted by the client
pub type Inputs = serde_json::Map<String, serde_json::Value>;

/// Build settings baked into a model image
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    /// Whether the model was built to run on a GPU
    #[serde(default)]
    pub gpu: bool,
}

/// Options for starting a model container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub image: String,
    /// `--gpus` value, `None` for CPU-only
    pub gpus: Option<String>,
    pub volumes: Vec<VolumeConfig>,
}

impl RunOptions {
    /// Derive run options for `image` from its build settings
    pub fn from_build(image: &str, build: &BuildConfig, volumes: &[VolumeConfig]) -> Self {
        Self {
            image: image.to_string(),
            gpus: build.gpu.then(|| "all".to_string()),
            volumes: volumes.to_vec(),
        }
    }
}

/// Successful output of one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    pub output: serde_json::Value,
    /// Logs captured by the model server, if it reported any
    pub logs: Option<String>,
}

/// Something that can run model images
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    async fn inspect_config(&self, image: &str) -> Result<BuildConfig, RuntimeError>;

    /// Start a container and wait until its model server is ready
    async fn start(&self, options: &RunOptions) -> Result<Box<dyn RunningModel>, RuntimeError>;
}

/// A started, ready model container
#[async_trait]
pub trait RunningModel: Send + Sync {
    /// Container identifier, for logging
    fn id(&self) -> &str;

    async fn predict(&self, input: &Inputs) -> Result<PredictionOutput, RuntimeError>;

    async fn stop(&mut self) -> Result<(), RuntimeError>;
}
