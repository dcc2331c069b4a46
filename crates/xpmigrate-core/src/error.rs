//! Error types shared across the migrator crates.

use thiserror::Error;

/// Errors surfaced by the injected cluster clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A remote list, apply or discovery call failed.
    #[error("{operation} failed for {target}: {reason}")]
    Request {
        operation: &'static str,
        target: String,
        reason: String,
    },

    /// The REST mapper has no mapping for the requested type.
    #[error("no REST mapping for {name}")]
    NoMapping { name: String },

    /// The operation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,
}

impl ClientError {
    /// Build a request error with operation and target context.
    pub fn request(
        operation: &'static str,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ClientError::Request {
            operation,
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Failed logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot initialize logging: {0}")]
    Init(String),
}

/// Result type alias for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
