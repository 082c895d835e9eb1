//! Error types
//!
//! One enum per collaborator so callers can tell a registry outage from a
//! missing prediction file. The binary wraps these in `anyhow`.

use thiserror::Error;

/// Failures talking to the model registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Connection, TLS or body read failure
    #[error("registry request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Registry answered with a non-2xx status
    #[error("registry returned {status} for {path}")]
    Status { status: u16, path: String },

    /// Registry answered 2xx with a body that is not JSON
    #[error("registry returned a malformed body for {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures from the container runtime or the model running inside it
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to determine if {image} exists: {message}")]
    Inspect { image: String, message: String },

    #[error("failed to pull {image}: {message}")]
    Pull { image: String, message: String },

    #[error("failed to start {image}: {message}")]
    Start { image: String, message: String },

    #[error("failed to stop container {container}: {message}")]
    Stop { container: String, message: String },

    #[error("prediction failed: {0}")]
    Predict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures reading or writing prediction records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("prediction not found: {0}")]
    NotFound(String),

    #[error("unable to read prediction {id}: {source}")]
    Read {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write prediction {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse prediction {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to serialize prediction {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the engine's request-facing operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unable to open prediction store: {0}")]
    StoreInit(#[source] std::io::Error),

    /// The worker has exited and no longer drains the queue
    #[error("prediction queue is closed")]
    QueueClosed,
}
