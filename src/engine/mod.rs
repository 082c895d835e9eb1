//! Prediction engine
//!
//! This module ties request handling to model execution:
//! - VersionCache: version metadata fetched from the registry
//! - RuntimeLoader: the single running model container
//! - PredictionStore: one persisted record per prediction
//! - Request queue + Worker: serialized execution in submission order
//!
//! `Engine` is the request-facing half. It persists and enqueues; the
//! worker spawned alongside it does the rest.

mod loader;
mod prediction;
mod queue;
mod store;
mod versions;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use loader::RuntimeLoader;
pub use prediction::{Prediction, PredictionStatus, PredictionUrls};
pub use queue::{request_queue, QueueReceiver, QueueSender, DEFAULT_QUEUE_CAPACITY};
pub use store::PredictionStore;
pub use versions::{VersionCache, VersionInfo};
pub use worker::{Abandoned, Worker};

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::RotorConfig;
use crate::error::EngineError;
use crate::registry::{parse_version_ids, versions_path, Registry};
use crate::runtime::{ContainerBackend, Inputs};

/// Request-facing side of the prediction engine; shareable across handlers
pub struct Engine {
    versions: Arc<VersionCache>,
    store: Arc<PredictionStore>,
    queue: QueueSender,
    registry: Arc<dyn Registry>,
    source: String,
}

impl Engine {
    /// Open the store, spawn the worker and return the engine with the
    /// worker's handle. The worker exits once the engine is dropped.
    pub async fn start(
        config: &RotorConfig,
        registry: Arc<dyn Registry>,
        backend: Arc<dyn ContainerBackend>,
    ) -> Result<(Self, JoinHandle<()>), EngineError> {
        let store = PredictionStore::open(&config.engine.predictions_dir)
            .await
            .map_err(EngineError::StoreInit)?;
        let store = Arc::new(store);
        let versions = Arc::new(VersionCache::new(Arc::clone(&registry)));
        let (queue, receiver) = request_queue(config.engine.queue_capacity);

        let loader = RuntimeLoader::new(backend, config.runtime.volumes.clone());
        let worker = Worker::new(
            Arc::clone(&versions),
            Arc::clone(&store),
            loader,
            receiver,
            config.registry.image_host.clone(),
        );
        let handle = tokio::spawn(worker.run());

        tracing::info!(
            predictions_dir = %store.dir().display(),
            queue_capacity = config.engine.queue_capacity,
            "engine started"
        );

        Ok((
            Self {
                versions,
                store,
                queue,
                registry,
                source: config.engine.source.clone(),
            },
            handle,
        ))
    }

    #[cfg(test)]
    pub fn versions(&self) -> &VersionCache {
        &self.versions
    }

    /// Fetch-or-cache a version's metadata
    pub async fn ensure_version(
        &self,
        version_id: &str,
        user_name: &str,
        model_name: &str,
        authorization: &str,
    ) -> Result<VersionInfo, EngineError> {
        Ok(self
            .versions
            .ensure(version_id, user_name, model_name, authorization)
            .await?)
    }

    /// Fetch a model's version listing, caching every version it names.
    ///
    /// Per-version failures are logged only; the listing is returned verbatim.
    pub async fn list_versions(
        &self,
        user_name: &str,
        model_name: &str,
        authorization: &str,
    ) -> Result<String, EngineError> {
        let path = versions_path(user_name, model_name);
        tracing::info!(%path, "getting model versions from registry");
        let body = self.registry.fetch(&path, authorization).await?;

        match parse_version_ids(&body) {
            Ok(ids) => {
                for id in ids {
                    if let Err(e) = self
                        .versions
                        .ensure(&id, user_name, model_name, authorization)
                        .await
                    {
                        tracing::warn!(version = %id, error = %e, "unable to ensure version");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "unable to parse model versions"),
        }

        Ok(body)
    }

    /// Persist a new `starting` prediction and queue it.
    ///
    /// Returns as soon as the id is queued; waits only while the queue is full.
    pub async fn submit(&self, version_id: &str, input: Inputs) -> Result<Prediction, EngineError> {
        let prediction = Prediction::new(version_id, input, &self.source);
        self.store.save(&prediction).await?;
        self.queue.enqueue(prediction.id.clone()).await?;

        tracing::debug!(prediction_id = %prediction.id, version = version_id, "prediction queued");
        Ok(prediction)
    }

    /// Current record for a prediction
    pub async fn query(&self, id: &str) -> Result<Prediction, EngineError> {
        Ok(self.store.load(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::error::StoreError;
    use crate::registry::version_path;
    use super::testing::{FakeBackend, FakeRegistry};

    const IMG1: &str = "r8.im/alice/model@sha256:v1";
    const IMG2: &str = "r8.im/alice/model@sha256:v2";

    struct Harness {
        _dir: TempDir,
        engine: Engine,
        worker: JoinHandle<()>,
        backend: Arc<FakeBackend>,
        registry: Arc<FakeRegistry>,
    }

    async fn harness(backend: FakeBackend) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut config = RotorConfig::default();
        config.engine.predictions_dir = dir.path().join("predictions");

        let registry = Arc::new(FakeRegistry::new());
        for v in ["v1", "v2"] {
            registry.insert(&version_path("alice", "model", v), r#"{"openapi":"3.0.2"}"#);
        }
        let backend = Arc::new(backend);

        let (engine, worker) = Engine::start(&config, registry.clone(), backend.clone())
            .await
            .unwrap();
        Harness {
            _dir: dir,
            engine,
            worker,
            backend,
            registry,
        }
    }

    fn input(v: serde_json::Value) -> Inputs {
        v.as_object().cloned().unwrap()
    }

    async fn wait_terminal(engine: &Engine, id: &str) -> Prediction {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let p = engine.query(id).await.unwrap();
                if p.status.is_terminal() {
                    return p;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("prediction did not complete")
    }

    #[tokio::test]
    async fn test_submit_returns_starting_record() {
        let h = harness(FakeBackend::new().with_images(&[IMG1])).await;

        let p = h.engine.submit("v1", input(json!({"x": 1}))).await.unwrap();
        assert_eq!(p.status, PredictionStatus::Starting);
        assert_eq!(p.version_id, "v1");
        assert_eq!(p.source, "local-api");
    }

    #[tokio::test]
    async fn test_prediction_succeeds_on_loaded_runtime() {
        let h = harness(FakeBackend::new().with_images(&[IMG1])).await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();

        let first = h.engine.submit("v1", input(json!({"x": 1}))).await.unwrap();
        wait_terminal(&h.engine, &first.id).await;
        let calls_before = h.backend.starts().len() + h.backend.stops().len();

        let p = h.engine.submit("v1", input(json!({"x": 1}))).await.unwrap();
        let done = wait_terminal(&h.engine, &p.id).await;

        assert_eq!(done.status, PredictionStatus::Succeeded);
        assert_eq!(
            done.output,
            Some(json!({"image": IMG1, "echo": {"x": 1}}))
        );
        assert!(done.completed_at.is_some());
        assert_eq!(
            h.backend.starts().len() + h.backend.stops().len(),
            calls_before
        );
    }

    #[tokio::test]
    async fn test_versions_processed_in_submission_order() {
        let h = harness(FakeBackend::new().with_images(&[IMG1, IMG2])).await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();
        h.engine.ensure_version("v2", "alice", "model", "tok").await.unwrap();

        let p1 = h.engine.submit("v1", input(json!({"n": 1}))).await.unwrap();
        let p2 = h.engine.submit("v2", input(json!({"n": 2}))).await.unwrap();
        wait_terminal(&h.engine, &p2.id).await;

        assert_eq!(
            wait_terminal(&h.engine, &p1.id).await.status,
            PredictionStatus::Succeeded
        );
        assert_eq!(h.backend.predictions(), vec![IMG1, IMG2]);
        assert_eq!(h.backend.starts(), vec![IMG1, IMG2]);
        assert_eq!(h.backend.stops(), vec![IMG1]);
    }

    #[tokio::test]
    async fn test_unknown_version_is_abandoned() {
        let h = harness(FakeBackend::new().with_images(&[IMG1])).await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();

        let stuck = h.engine.submit("nope", input(json!({}))).await.unwrap();
        let next = h.engine.submit("v1", input(json!({}))).await.unwrap();

        assert_eq!(
            wait_terminal(&h.engine, &next.id).await.status,
            PredictionStatus::Succeeded
        );
        assert_eq!(
            h.engine.query(&stuck.id).await.unwrap().status,
            PredictionStatus::Starting
        );
        assert!(!h.worker.is_finished());
    }

    #[tokio::test]
    async fn test_load_failure_is_abandoned() {
        let h = harness(
            FakeBackend::new()
                .with_images(&[IMG1, IMG2])
                .failing_start(IMG2),
        )
        .await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();
        h.engine.ensure_version("v2", "alice", "model", "tok").await.unwrap();

        let stuck = h.engine.submit("v2", input(json!({}))).await.unwrap();
        let next = h.engine.submit("v1", input(json!({}))).await.unwrap();

        assert_eq!(
            wait_terminal(&h.engine, &next.id).await.status,
            PredictionStatus::Succeeded
        );
        assert_eq!(
            h.engine.query(&stuck.id).await.unwrap().status,
            PredictionStatus::Starting
        );
    }

    #[tokio::test]
    async fn test_inference_failure_marks_failed() {
        let h = harness(FakeBackend::new().with_images(&[IMG1])).await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();

        let p = h.engine.submit("v1", input(json!({"fail": true}))).await.unwrap();
        let done = wait_terminal(&h.engine, &p.id).await;

        assert_eq!(done.status, PredictionStatus::Failed);
        assert_eq!(done.error.as_deref(), Some("prediction failed: requested failure"));
        assert!(done.output.is_none());

        // Terminal records stay put.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.engine.query(&p.id).await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_swap_survives_stop_failure() {
        let h = harness(
            FakeBackend::new()
                .with_images(&[IMG1, IMG2])
                .failing_stop(),
        )
        .await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();
        h.engine.ensure_version("v2", "alice", "model", "tok").await.unwrap();

        h.engine.submit("v1", input(json!({}))).await.unwrap();
        let p2 = h.engine.submit("v2", input(json!({}))).await.unwrap();

        assert_eq!(
            wait_terminal(&h.engine, &p2.id).await.status,
            PredictionStatus::Succeeded
        );
        assert_eq!(h.backend.stops(), vec![IMG1]);
        assert_eq!(h.backend.starts(), vec![IMG1, IMG2]);
    }

    #[tokio::test]
    async fn test_query_unknown_id() {
        let h = harness(FakeBackend::new()).await;
        assert!(matches!(
            h.engine.query("missing").await,
            Err(EngineError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_versions_caches_each_version() {
        let h = harness(FakeBackend::new()).await;
        let listing = r#"{"previous":null,"next":null,"results":[{"id":"v1"},{"id":"v2"},{"id":"gone"}]}"#;
        h.registry.insert(&versions_path("alice", "model"), listing);

        let body = h.engine.list_versions("alice", "model", "tok").await.unwrap();

        assert_eq!(body, listing);
        assert!(h.engine.versions().has("v1").await);
        assert!(h.engine.versions().has("v2").await);
        assert!(!h.engine.versions().has("gone").await);
    }

    #[tokio::test]
    async fn test_list_versions_registry_failure() {
        let h = harness(FakeBackend::new()).await;
        assert!(matches!(
            h.engine.list_versions("bob", "other", "tok").await,
            Err(EngineError::Registry(_))
        ));
    }

    #[tokio::test]
    async fn test_worker_exits_when_engine_dropped() {
        let h = harness(FakeBackend::new().with_images(&[IMG1])).await;
        h.engine.ensure_version("v1", "alice", "model", "tok").await.unwrap();
        let p = h.engine.submit("v1", input(json!({}))).await.unwrap();
        wait_terminal(&h.engine, &p.id).await;

        drop(h.engine);
        tokio::time::timeout(Duration::from_secs(5), h.worker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.backend.stops(), vec![IMG1]);
    }
}
