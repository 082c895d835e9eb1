//! Version metadata cache
//!
//! Version documents are immutable in the registry, so an entry is fetched
//! once and kept for the life of the process. Failed fetches are never
//! cached; the next `ensure` retries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::RegistryError;
use crate::registry::{version_path, Registry};

/// Metadata for one model version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub user_name: String,
    pub model_name: String,
    pub version_id: String,
    /// Registry document, verbatim
    pub spec_document: String,
}

impl VersionInfo {
    /// Image reference for this version under `image_host`
    pub fn image_name(&self, image_host: &str) -> String {
        format!(
            "{}/{}/{}@sha256:{}",
            image_host, self.user_name, self.model_name, self.version_id
        )
    }
}

/// In-memory cache of version metadata, filled from the registry on demand
pub struct VersionCache {
    versions: RwLock<HashMap<String, VersionInfo>>,
    registry: Arc<dyn Registry>,
}

impl VersionCache {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            versions: RwLock::new(HashMap::new()),
            registry,
        }
    }

    pub async fn has(&self, version_id: &str) -> bool {
        self.versions.read().await.contains_key(version_id)
    }

    pub async fn get(&self, version_id: &str) -> Option<VersionInfo> {
        self.versions.read().await.get(version_id).cloned()
    }

    /// Return the cached version, fetching it from the registry on a miss
    pub async fn ensure(
        &self,
        version_id: &str,
        user_name: &str,
        model_name: &str,
        authorization: &str,
    ) -> Result<VersionInfo, RegistryError> {
        if let Some(version) = self.get(version_id).await {
            return Ok(version);
        }

        // The lock is not held across the fetch; concurrent misses for the
        // same id may both fetch.
        let path = version_path(user_name, model_name, version_id);
        tracing::info!(%path, "getting version spec from registry");
        let spec_document = self.registry.fetch(&path, authorization).await?;

        let version = VersionInfo {
            user_name: user_name.to_string(),
            model_name: model_name.to_string(),
            version_id: version_id.to_string(),
            spec_document,
        };

        let mut versions = self.versions.write().await;
        let entry = versions
            .entry(version_id.to_string())
            .or_insert(version);
        Ok(entry.clone())
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.versions.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.versions.read().await.is_empty()
    }
}
