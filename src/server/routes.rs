//! Route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_prediction, get_prediction, health, model_version, model_versions, AppState,
};

/// Create the API router
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Model metadata, proxied from the registry
        .route("/v1/models/:user/:model/versions", get(model_versions))
        .route(
            "/v1/models/:user/:model/versions/:version_id",
            get(model_version),
        )
        // Predictions
        .route("/v1/predictions", post(create_prediction))
        .route("/v1/predictions/:id", get(get_prediction))
}
