//! In-memory fakes for engine tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{RegistryError, RuntimeError};
use crate::registry::Registry;
use crate::runtime::{
    BuildConfig, ContainerBackend, Inputs, PredictionOutput, RunOptions, RunningModel,
};

/// Registry serving canned documents by path; unknown paths return 503
#[derive(Default)]
pub struct FakeRegistry {
    documents: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, body: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert(path.to_string(), body.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.last_authorization.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn fetch(&self, path: &str, authorization: &str) -> Result<String, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_authorization.lock().unwrap() = Some(authorization.to_string());
        self.documents
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RegistryError::Status {
                status: 503,
                path: path.to_string(),
            })
    }
}

/// Everything the fake backend and its models were asked to do, by image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ImageExists(String),
    Pull(String),
    Inspect(String),
    Start(String),
    Stop(String),
    Predict(String),
}

/// Container backend that records calls instead of running anything.
///
/// Images are either local, or remote (pullable). Anything else fails to pull.
#[derive(Default)]
pub struct FakeBackend {
    local: Mutex<HashSet<String>>,
    remote: HashSet<String>,
    gpu: HashSet<String>,
    fail_start: HashSet<String>,
    fail_stop: bool,
    calls: Arc<Mutex<Vec<Call>>>,
    last_options: Mutex<Option<RunOptions>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(mut self, images: &[&str]) -> Self {
        let local = self.local.get_mut().unwrap();
        local.extend(images.iter().map(|i| i.to_string()));
        self
    }

    /// Remote-only images built for GPU
    pub fn with_gpu_images(mut self, images: &[&str]) -> Self {
        for image in images {
            self.remote.insert(image.to_string());
            self.gpu.insert(image.to_string());
        }
        self
    }

    pub fn failing_start(mut self, image: &str) -> Self {
        self.fail_start.insert(image.to_string());
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn starts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Stop(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn predictions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Predict(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn last_options(&self) -> Option<RunOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerBackend for FakeBackend {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.record(Call::ImageExists(image.to_string()));
        Ok(self.local.lock().unwrap().contains(image))
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        self.record(Call::Pull(image.to_string()));
        if !self.remote.contains(image) {
            return Err(RuntimeError::Pull {
                image: image.to_string(),
                message: "manifest unknown".to_string(),
            });
        }
        self.local.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    async fn inspect_config(&self, image: &str) -> Result<BuildConfig, RuntimeError> {
        self.record(Call::Inspect(image.to_string()));
        Ok(BuildConfig {
            gpu: self.gpu.contains(image),
        })
    }

    async fn start(&self, options: &RunOptions) -> Result<Box<dyn RunningModel>, RuntimeError> {
        self.record(Call::Start(options.image.clone()));
        *self.last_options.lock().unwrap() = Some(options.clone());

        if self.fail_start.contains(&options.image) {
            return Err(RuntimeError::Start {
                image: options.image.clone(),
                message: "container exited before becoming ready".to_string(),
            });
        }

        Ok(Box::new(FakeModel {
            id: format!("container-{}", options.image),
            image: options.image.clone(),
            fail_stop: self.fail_stop,
            calls: self.calls.clone(),
        }))
    }
}

/// Model that echoes its input; an input with a `fail` key fails
pub struct FakeModel {
    id: String,
    image: String,
    fail_stop: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

#[async_trait]
impl RunningModel for FakeModel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn predict(&self, input: &Inputs) -> Result<PredictionOutput, RuntimeError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Predict(self.image.clone()));

        if input.contains_key("fail") {
            return Err(RuntimeError::Predict("requested failure".to_string()));
        }
        Ok(PredictionOutput {
            output: json!({ "image": self.image, "echo": input }),
            logs: Some(format!("ran on {}", self.image)),
        })
    }

    async fn stop(&mut self) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(Call::Stop(self.image.clone()));
        if self.fail_stop {
            return Err(RuntimeError::Stop {
                container: self.id.clone(),
                message: "container refused to stop".to_string(),
            });
        }
        Ok(())
    }
}
