//! HTTP server command

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::config::RotorConfig;
use crate::engine::Engine;
use crate::registry::HttpRegistry;
use crate::runtime::DockerBackend;
use crate::server;

/// Load the config file if given, defaults otherwise
pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<RotorConfig> {
    match path {
        Some(path) => RotorConfig::from_path(path),
        None => Ok(RotorConfig::default()),
    }
}

/// Start the engine and serve the predictions API
pub async fn serve(
    port: Option<u16>,
    host: Option<String>,
    config: Option<PathBuf>,
    predictions_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config.as_ref())?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(dir) = predictions_dir {
        config.engine.predictions_dir = dir;
    }

    let registry = HttpRegistry::new(&config.registry).context("building registry client")?;
    let backend = DockerBackend::new(&config.runtime);

    tracing::info!("Starting rotor API...");
    let (engine, worker) = Engine::start(&config, Arc::new(registry), Arc::new(backend)).await?;

    run_until_shutdown(engine, worker, |engine| server::start(engine, config.server.clone())).await
}

/// Run `serve` over the engine. Once it returns, the engine is gone, so the
/// worker drains the queue, stops the loaded container and exits.
pub(crate) async fn run_until_shutdown<F, Fut>(
    engine: Engine,
    worker: JoinHandle<()>,
    serve: F,
) -> Result<()>
where
    F: FnOnce(Arc<Engine>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let result = serve(Arc::new(engine)).await;

    tracing::info!("server stopped, waiting for worker");
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "worker task failed");
    }
    result
}
