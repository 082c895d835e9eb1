//! Show a stored prediction

use std::path::PathBuf;

use anyhow::Result;

use super::serve::load_config;
use crate::engine::PredictionStore;

/// Print a prediction record as JSON
pub async fn show(id: String, config: Option<PathBuf>, predictions_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    let dir = predictions_dir.unwrap_or(config.engine.predictions_dir);

    let store = PredictionStore::open(&dir).await?;
    let prediction = store.load(&id).await?;

    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
