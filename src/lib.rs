//! Rotor - a local server for registry model versions
//!
//! Rotor fronts containerized model versions with a predictions API. It
//! keeps exactly one model container running, swapping it when a request
//! targets a different version, and runs predictions one at a time in
//! submission order.
//!
//! # Architecture
//!
//! - **registry**: fetches version metadata, forwarding the caller's credentials
//! - **runtime**: starts, stops and calls model containers (docker)
//! - **engine**: version cache, runtime loader, prediction store, queue and worker
//! - **server**: HTTP routes over the engine
//!
//! # Example
//!
//! ```bash
//! # Start the API on 127.0.0.1:5555
//! rotor serve
//!
//! # Cache a version, then predict with it
//! curl -H "Authorization: Token $TOKEN" \
//!     localhost:5555/v1/models/alice/model/versions/$VERSION
//! curl -X POST localhost:5555/v1/predictions \
//!     -d '{"version": "'$VERSION'", "input": {"prompt": "hi"}}'
//!
//! # Inspect a stored prediction
//! rotor show <id>
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod server;

// Re-export key types
pub use config::{RotorConfig, ServerConfig};
pub use engine::{Engine, Prediction, PredictionStatus};
pub use error::{EngineError, RegistryError, RuntimeError, StoreError};
