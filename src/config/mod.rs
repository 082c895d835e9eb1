//! Configuration system for rotor
//!
//! A single `RotorConfig` covers the HTTP server, the registry, the
//! prediction engine and the container runtime. Every field has a default,
//! so an empty file (or no file) is a valid configuration.

mod engine;
mod registry;
mod server;

pub use engine::{EngineConfig, RuntimeConfig, VolumeConfig};
pub use registry::RegistryConfig;
pub use server::ServerConfig;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Rotor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotorConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Prediction engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Container runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl RotorConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            _ => Self::from_yaml(path),
        }
    }
}
