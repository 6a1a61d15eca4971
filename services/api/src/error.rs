//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, plus the single
//! mapping from port errors to HTTP status codes used by every handler.

use crate::config::ConfigError;
use axum::http::StatusCode;
use outreach_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failed schema migration at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a port error onto the status codes the dashboard understands.
pub fn port_error_status(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::ServiceUnavailable(_)
        | PortError::Upstream(_)
        | PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a port error into the `(StatusCode, String)` rejection handlers return.
pub fn reject(err: PortError) -> (StatusCode, String) {
    (port_error_status(&err), err.to_string())
}
