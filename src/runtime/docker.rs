//! Docker CLI backend
//!
//! Drives the `docker` binary directly. Model images serve predictions over
//! HTTP on `container_port`, which is published on a random loopback port.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;

use super::{BuildConfig, ContainerBackend, Inputs, PredictionOutput, RunOptions, RunningModel};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

/// Image label carrying the model's build configuration
const CONFIG_LABEL: &str = "run.cog.config";

/// Backend that shells out to the docker CLI
pub struct DockerBackend {
    docker_bin: String,
    container_port: u16,
    ready_poll: Duration,
    client: reqwest::Client,
}

impl DockerBackend {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            docker_bin: config.docker_bin.clone(),
            container_port: config.container_port,
            ready_poll: config.ready_poll_interval(),
            client: reqwest::Client::new(),
        }
    }

    async fn docker(&self, args: &[&str]) -> std::io::Result<Output> {
        docker(&self.docker_bin, args).await
    }

    async fn is_running(&self, container: &str) -> bool {
        match self
            .docker(&["inspect", "--format", "{{.State.Running}}", container])
            .await
        {
            Ok(out) => out.status.success() && stdout(&out) == "true",
            Err(_) => false,
        }
    }

    async fn published_url(&self, container: &str) -> Result<String, String> {
        let port = format!("{}/tcp", self.container_port);
        let out = self
            .docker(&["port", container, port.as_str()])
            .await
            .map_err(|e| e.to_string())?;
        if !out.status.success() {
            return Err(stderr(&out));
        }

        let mapping = stdout(&out);
        let host_port = mapping
            .lines()
            .next()
            .and_then(|line| line.rsplit_once(':'))
            .map(|(_, port)| port.trim().to_string())
            .ok_or_else(|| format!("unexpected port mapping: {:?}", mapping))?;

        Ok(format!("http://127.0.0.1:{}", host_port))
    }

    /// Poll the health check until the model reports ready
    async fn wait_ready(&self, container: &str, base_url: &str) -> Result<(), String> {
        let url = format!("{}/health-check", base_url);
        loop {
            if !self.is_running(container).await {
                return Err("container exited before becoming ready".to_string());
            }

            if let Ok(resp) = self.client.get(&url).send().await {
                if let Ok(health) = resp.json::<HealthCheck>().await {
                    match health_state(&health.status) {
                        Health::Ready => return Ok(()),
                        Health::Failed => {
                            return Err(format!("model setup failed: {}", health.status))
                        }
                        Health::Starting => {
                            tracing::debug!(container, status = %health.status, "waiting for model")
                        }
                    }
                }
            }

            tokio::time::sleep(self.ready_poll).await;
        }
    }

    /// Resolve the published port and wait for readiness
    async fn await_started(&self, container: &str) -> Result<String, String> {
        let base_url = self.published_url(container).await?;
        self.wait_ready(container, &base_url).await?;
        Ok(base_url)
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let out = self
            .docker(&["image", "inspect", "--format", "{{.Id}}", image])
            .await
            .map_err(|e| RuntimeError::Inspect {
                image: image.to_string(),
                message: e.to_string(),
            })?;

        if out.status.success() {
            return Ok(true);
        }

        let err = stderr(&out);
        if err.to_lowercase().contains("no such image") {
            Ok(false)
        } else {
            Err(RuntimeError::Inspect {
                image: image.to_string(),
                message: err,
            })
        }
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        let pull_err = |message| RuntimeError::Pull {
            image: image.to_string(),
            message,
        };

        let out = self
            .docker(&["pull", image])
            .await
            .map_err(|e| pull_err(e.to_string()))?;
        if !out.status.success() {
            return Err(pull_err(stderr(&out)));
        }
        Ok(())
    }

    async fn inspect_config(&self, image: &str) -> Result<BuildConfig, RuntimeError> {
        let format = format!("{{{{index .Config.Labels \"{}\"}}}}", CONFIG_LABEL);
        let inspect_err = |message| RuntimeError::Inspect {
            image: image.to_string(),
            message,
        };

        let out = self
            .docker(&["image", "inspect", "--format", format.as_str(), image])
            .await
            .map_err(|e| inspect_err(e.to_string()))?;
        if !out.status.success() {
            return Err(inspect_err(stderr(&out)));
        }

        parse_config_label(&stdout(&out)).map_err(|e| inspect_err(e.to_string()))
    }

    async fn start(&self, options: &RunOptions) -> Result<Box<dyn RunningModel>, RuntimeError> {
        let start_err = |message| RuntimeError::Start {
            image: options.image.clone(),
            message,
        };

        let args = run_args(options, self.container_port);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self
            .docker(&args)
            .await
            .map_err(|e| start_err(e.to_string()))?;
        if !out.status.success() {
            return Err(start_err(stderr(&out)));
        }

        let container = stdout(&out);
        tracing::debug!(%container, image = %options.image, "container started");

        let base_url = match self.await_started(&container).await {
            Ok(url) => url,
            Err(message) => {
                if let Err(e) = stop_container(&self.docker_bin, &container).await {
                    tracing::warn!(%container, error = %e, "failed to stop container after failed start");
                }
                return Err(start_err(message));
            }
        };

        Ok(Box::new(DockerModel {
            id: container,
            base_url,
            docker_bin: self.docker_bin.clone(),
            client: self.client.clone(),
        }))
    }
}

/// A running model container
pub struct DockerModel {
    id: String,
    base_url: String,
    docker_bin: String,
    client: reqwest::Client,
}

#[async_trait]
impl RunningModel for DockerModel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn predict(&self, input: &Inputs) -> Result<PredictionOutput, RuntimeError> {
        let url = format!("{}/predictions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| RuntimeError::Predict(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RuntimeError::Predict(e.to_string()))?;
        if !status.is_success() {
            return Err(RuntimeError::Predict(format!(
                "model server returned {}: {}",
                status, body
            )));
        }

        parse_prediction_response(&body)
    }

    async fn stop(&mut self) -> Result<(), RuntimeError> {
        stop_container(&self.docker_bin, &self.id).await
    }
}

#[derive(Debug, Deserialize)]
struct HealthCheck {
    status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Ready,
    Starting,
    Failed,
}

/// Classify a health-check status; anything unrecognized keeps polling
fn health_state(status: &str) -> Health {
    match status.to_ascii_uppercase().as_str() {
        "READY" | "BUSY" => Health::Ready,
        "SETUP_FAILED" | "DEFUNCT" => Health::Failed,
        _ => Health::Starting,
    }
}

#[derive(Debug, Deserialize)]
struct ImageConfig {
    #[serde(default)]
    build: BuildConfig,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    logs: Option<String>,
}

async fn docker(bin: &str, args: &[&str]) -> std::io::Result<Output> {
    Command::new(bin).args(args).output().await
}

async fn stop_container(bin: &str, container: &str) -> Result<(), RuntimeError> {
    let stop_err = |message| RuntimeError::Stop {
        container: container.to_string(),
        message,
    };

    let out = docker(bin, &["stop", container])
        .await
        .map_err(|e| stop_err(e.to_string()))?;
    if !out.status.success() {
        return Err(stop_err(stderr(&out)));
    }
    Ok(())
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).trim().to_string()
}

fn run_args(options: &RunOptions, container_port: u16) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--detach".to_string(),
        "--rm".to_string(),
        "--publish".to_string(),
        format!("127.0.0.1::{}", container_port),
    ];
    if let Some(gpus) = &options.gpus {
        args.push("--gpus".to_string());
        args.push(gpus.clone());
    }
    for volume in &options.volumes {
        args.push("--volume".to_string());
        args.push(format!("{}:{}", volume.source, volume.destination));
    }
    args.push(options.image.clone());
    args
}

/// Images without the label (docker prints `<no value>`) get default settings
fn parse_config_label(label: &str) -> Result<BuildConfig, serde_json::Error> {
    let label = label.trim();
    if label.is_empty() || label == "<no value>" {
        return Ok(BuildConfig::default());
    }
    let config: ImageConfig = serde_json::from_str(label)?;
    Ok(config.build)
}

fn parse_prediction_response(body: &str) -> Result<PredictionOutput, RuntimeError> {
    let resp: PredictionResponse = serde_json::from_str(body)
        .map_err(|e| RuntimeError::Predict(format!("malformed model response: {}", e)))?;

    let failed = resp
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("failed"))
        .unwrap_or(false);
    if failed || resp.error.as_deref().is_some_and(|e| !e.is_empty()) {
        return Err(RuntimeError::Predict(
            resp.error.unwrap_or_else(|| "prediction failed".to_string()),
        ));
    }

    Ok(PredictionOutput {
        output: resp.output,
        logs: resp.logs,
    })
}
