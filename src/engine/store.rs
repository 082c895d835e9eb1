//! File-backed prediction store
//!
//! One pretty-printed JSON document per prediction at `{dir}/{id}.json`.
//! Saves write a sibling temp file and rename it over the target, so a
//! concurrent `load` sees either the old or the new record, never a torn one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::engine::Prediction;
use crate::error::StoreError;

pub struct PredictionStore {
    dir: PathBuf,
}

impl PredictionStore {
    /// Open the store, creating its directory if needed
    pub async fn open<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        if !valid_id(id) {
            return None;
        }
        Some(self.dir.join(format!("{}.json", id)))
    }

    /// Write the full record, replacing any previous content for its id
    pub async fn save(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let id = &prediction.id;
        let path = self
            .path_for(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let content =
            serde_json::to_vec_pretty(prediction).map_err(|source| StoreError::Serialize {
                id: id.clone(),
                source,
            })?;

        let tmp = self.dir.join(format!(".{}.json.tmp", id));
        let write_err = |source| StoreError::Write {
            id: id.clone(),
            source,
        };
        tokio::fs::write(&tmp, &content).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;

        Ok(())
    }

    pub async fn load(&self, id: &str) -> Result<Prediction, StoreError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let content = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Read {
                    id: id.to_string(),
                    source,
                }
            }
        })?;

        serde_json::from_slice(&content).map_err(|source| StoreError::Parse {
            id: id.to_string(),
            source,
        })
    }
}

/// Ids map directly to file names; anything that could escape the
/// directory is rejected.
fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
