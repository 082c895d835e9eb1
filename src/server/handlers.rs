//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{EngineError, StoreError};
use crate::runtime::Inputs;

/// Shared application state
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Version spec, fetched from the registry on first request and cached
pub async fn model_version(
    State(state): State<Arc<AppState>>,
    Path((user, model, version_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let auth = authorization(&headers);
    match state
        .engine
        .ensure_version(&version_id, &user, &model, &auth)
        .await
    {
        Ok(version) => json_body(version.spec_document),
        Err(e) => {
            tracing::warn!(version = %version_id, error = %e, "unable to ensure version");
            error_response(StatusCode::BAD_REQUEST, "registry_error", e.to_string())
        }
    }
}

/// Version listing, proxied verbatim; every listed version gets cached
pub async fn model_versions(
    State(state): State<Arc<AppState>>,
    Path((user, model)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let auth = authorization(&headers);
    match state.engine.list_versions(&user, &model, &auth).await {
        Ok(body) => json_body(body),
        Err(e) => {
            tracing::warn!(%user, %model, error = %e, "unable to get model versions");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "registry_error",
                e.to_string(),
            )
        }
    }
}

/// Queue a prediction; responds immediately with the `starting` record
pub async fn create_prediction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                rejection.body_text(),
            )
        }
    };

    match state.engine.submit(&request.version, request.input).await {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => engine_error(e),
    }
}

/// Current state of a prediction
pub async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.query(&id).await {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => engine_error(e),
    }
}

/// The inbound `Authorization` header, forwarded to the registry as-is
fn authorization(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn engine_error(e: EngineError) -> Response {
    let (status, kind) = match &e {
        EngineError::Store(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "invalid_request_error")
        }
        EngineError::QueueClosed => (StatusCode::SERVICE_UNAVAILABLE, "server_error"),
        EngineError::Registry(_) => (StatusCode::BAD_GATEWAY, "registry_error"),
        EngineError::Store(_) | EngineError::StoreInit(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    };
    if status.is_server_error() {
        tracing::warn!(error = %e, "request failed");
    }
    error_response(status, kind, e.to_string())
}

fn error_response(status: StatusCode, kind: &str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                message,
                r#type: kind.to_string(),
            },
        }),
    )
        .into_response()
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub input: Inputs,
    pub version: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}
