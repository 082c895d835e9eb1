//! Model registry client
//!
//! The registry owns version metadata. Rotor only ever issues `GET`s against
//! it, forwarding the caller's `Authorization` header untouched, and treats
//! the returned document as opaque JSON.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::RegistryConfig;
use crate::error::RegistryError;

/// Source of version metadata
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the document at `path`, returning the body verbatim
    async fn fetch(&self, path: &str, authorization: &str) -> Result<String, RegistryError>;
}

/// Path of a single version document
pub fn version_path(user_name: &str, model_name: &str, version_id: &str) -> String {
    format!(
        "/v1/models/{}/{}/versions/{}",
        user_name, model_name, version_id
    )
}

/// Path of a model's version listing
pub fn versions_path(user_name: &str, model_name: &str) -> String {
    format!("/v1/models/{}/{}/versions", user_name, model_name)
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    results: Vec<VersionSummary>,
}

#[derive(Debug, Deserialize)]
struct VersionSummary {
    id: String,
}

/// Extract the version ids from a version listing body
pub fn parse_version_ids(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let response: VersionsResponse = serde_json::from_str(body)?;
    Ok(response.results.into_iter().map(|v| v.id).collect())
}

/// Registry reached over HTTP
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn fetch(&self, path: &str, authorization: &str) -> Result<String, RegistryError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "registry request");

        let transport = |source| RegistryError::Transport {
            path: path.to_string(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.text().await.map_err(transport)?;

        // Body is cached as-is, but must at least be JSON.
        serde_json::from_str::<serde_json::Value>(&body).map_err(|source| {
            RegistryError::Malformed {
                path: path.to_string(),
                source,
            }
        })?;

        Ok(body)
    }
}
