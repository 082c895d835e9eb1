//! HTTP server for predictions
//!
//! Exposes registry-compatible model routes and an asynchronous
//! predictions API backed by the engine.

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::Engine;

pub use handlers::AppState;
pub use routes::api_routes;

/// Build the application router
pub fn router(engine: Arc<Engine>, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState::new(engine));

    let mut app = Router::new().merge(api_routes()).with_state(state);

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    if config.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app
}

/// Start the HTTP server
pub async fn start(engine: Arc<Engine>, config: ServerConfig) -> Result<()> {
    let app = router(engine, &config);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  GET  /v1/models/{{user}}/{{model}}/versions - List versions");
    tracing::info!("  GET  /v1/models/{{user}}/{{model}}/versions/{{id}} - Version spec");
    tracing::info!("  POST /v1/predictions - Create prediction");
    tracing::info!("  GET  /v1/predictions/{{id}} - Get prediction");

    axum::serve(listener, app).await?;

    Ok(())
}
