//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::rest::DispatchError;

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request path outside the configured context path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request's error handler failed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The blocking dispatch task panicked or was cancelled.
    #[error("Dispatch task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    /// Invalid server configuration document.
    #[error("Configuration error: {0}")]
    ConfigError(#[source] serde_json::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
