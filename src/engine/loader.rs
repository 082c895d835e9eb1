//! Runtime loader
//!
//! Owns the single runtime slot. Loading a different version stops whatever
//! is running and starts the new image; loading the version already in the
//! slot does nothing. Only the worker calls into this, so there is no lock.

use std::sync::Arc;

use crate::config::VolumeConfig;
use crate::error::RuntimeError;
use crate::runtime::{ContainerBackend, RunOptions, RunningModel};

/// The runtime currently occupying the slot
struct LoadedRuntime {
    version_id: String,
    model: Box<dyn RunningModel>,
}

pub struct RuntimeLoader {
    backend: Arc<dyn ContainerBackend>,
    volumes: Vec<VolumeConfig>,
    current: Option<LoadedRuntime>,
}

impl RuntimeLoader {
    pub fn new(backend: Arc<dyn ContainerBackend>, volumes: Vec<VolumeConfig>) -> Self {
        Self {
            backend,
            volumes,
            current: None,
        }
    }

    /// Version whose runtime is running, if any
    pub fn loaded_version(&self) -> Option<&str> {
        self.current.as_ref().map(|rt| rt.version_id.as_str())
    }

    /// The running model, if any
    pub fn model(&self) -> Option<&dyn RunningModel> {
        self.current.as_ref().map(|rt| rt.model.as_ref())
    }

    /// Make `version_id` (served by `image`) the running runtime.
    ///
    /// On failure the slot is left empty, so the next call retries the load
    /// rather than taking the fast path.
    pub async fn ensure_loaded(
        &mut self,
        image: &str,
        version_id: &str,
    ) -> Result<&dyn RunningModel, RuntimeError> {
        let loaded = self.loaded_version() == Some(version_id);
        if !loaded {
            let options = self.resolve(image).await?;

            if let Some(err) = self.unload().await {
                tracing::warn!(error = %err, "failed to stop container, starting replacement anyway");
            }

            tracing::info!(version = version_id, %image, "loading model version");
            let model = self.backend.start(&options).await?;
            tracing::info!(version = version_id, container = model.id(), "ready model version");

            self.current = Some(LoadedRuntime {
                version_id: version_id.to_string(),
                model,
            });
        }

        self.model()
            .ok_or_else(|| RuntimeError::Start {
                image: image.to_string(),
                message: "runtime slot empty after load".to_string(),
            })
    }

    /// Stop and clear the current runtime.
    ///
    /// The slot is always cleared. A stop failure is returned for the caller
    /// to report; it never blocks a replacement from starting.
    pub async fn unload(&mut self) -> Option<RuntimeError> {
        let mut runtime = self.current.take()?;
        tracing::info!(version = %runtime.version_id, container = runtime.model.id(), "stopping container");
        runtime.model.stop().await.err()
    }

    /// Make sure the image is present locally and derive its run options
    async fn resolve(&self, image: &str) -> Result<RunOptions, RuntimeError> {
        if !self.backend.image_exists(image).await? {
            tracing::info!(%image, "pulling image");
            self.backend.pull(image).await?;
        }

        let build = self.backend.inspect_config(image).await?;
        Ok(RunOptions::from_build(image, &build, &self.volumes))
    }
}
