//! services/api/src/error.rs
//!
//! Startup and serve-loop failures of the `api` binary. Request-level errors
//! never reach this type; handlers map them to status codes themselves.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Environment variables or the credentials file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid CORS_ORIGIN '{origin}': {reason}")]
    CorsOrigin { origin: String, reason: String },

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
