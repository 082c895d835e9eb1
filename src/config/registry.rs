//! Registry configuration settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where version metadata and model images come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry API (paths are appended verbatim)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host prefix of model images (`{image_host}/{user}/{model}@sha256:{version}`)
    #[serde(default = "default_image_host")]
    pub image_host: String,

    /// Per-request timeout for registry calls (None = no timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_image_host() -> String {
    "r8.im".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image_host: default_image_host(),
            timeout_secs: None,
        }
    }
}

impl RegistryConfig {
    /// Registry request timeout, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
