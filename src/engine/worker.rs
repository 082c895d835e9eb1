//! Prediction worker
//!
//! Drains the queue one prediction at a time. A failure on one item is
//! logged and the loop moves on to the next.

use std::sync::Arc;

use thiserror::Error;

use crate::engine::{
    PredictionStatus, PredictionStore, QueueReceiver, RuntimeLoader, VersionCache,
};
use crate::error::{RuntimeError, StoreError};

/// Why an item was dropped without a terminal status being written
#[derive(Debug, Error)]
pub enum Abandoned {
    #[error("error loading prediction: {0}")]
    Load(#[source] StoreError),

    /// Versions are only known once their metadata has been requested
    #[error("version not found: {0}")]
    UnknownVersion(String),

    #[error("unable to load version: {0}")]
    Runtime(#[source] RuntimeError),

    #[error("error saving prediction: {0}")]
    Save(#[source] StoreError),
}

pub struct Worker {
    versions: Arc<VersionCache>,
    store: Arc<PredictionStore>,
    loader: RuntimeLoader,
    queue: QueueReceiver,
    image_host: String,
}

impl Worker {
    pub fn new(
        versions: Arc<VersionCache>,
        store: Arc<PredictionStore>,
        loader: RuntimeLoader,
        queue: QueueReceiver,
        image_host: String,
    ) -> Self {
        Self {
            versions,
            store,
            loader,
            queue,
            image_host,
        }
    }

    /// Process predictions until every queue sender is dropped
    pub async fn run(mut self) {
        while let Some(id) = self.queue.dequeue().await {
            tracing::info!(prediction_id = %id, "running prediction");
            match self.process(&id).await {
                Ok(status) => {
                    tracing::info!(prediction_id = %id, ?status, "prediction finished")
                }
                Err(e) => tracing::warn!(prediction_id = %id, error = %e, "prediction abandoned"),
            }
        }

        tracing::info!("prediction queue closed, worker exiting");
        if let Some(err) = self.loader.unload().await {
            tracing::warn!(error = %err, "failed to stop container on shutdown");
        }
    }

    async fn process(&mut self, id: &str) -> Result<PredictionStatus, Abandoned> {
        let mut prediction = self.store.load(id).await.map_err(Abandoned::Load)?;
        if prediction.status.is_terminal() {
            tracing::debug!(prediction_id = %id, "prediction already complete");
            return Ok(prediction.status);
        }

        let version = self
            .versions
            .get(&prediction.version_id)
            .await
            .ok_or_else(|| Abandoned::UnknownVersion(prediction.version_id.clone()))?;
        let image = version.image_name(&self.image_host);

        let model = self
            .loader
            .ensure_loaded(&image, &prediction.version_id)
            .await
            .map_err(Abandoned::Runtime)?;

        let result = model.predict(&prediction.input).await;
        if let Err(e) = &result {
            tracing::warn!(prediction_id = %id, error = %e, "error predicting");
        }
        prediction.complete(result);

        self.store
            .save(&prediction)
            .await
            .map_err(Abandoned::Save)?;
        Ok(prediction.status)
    }
}
