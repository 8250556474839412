//! Error types for the audit pipeline.

use thiserror::Error;

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in audit operations.
///
/// None of these ever escape `AuditService::record_event`; they surface from
/// destination adapters, configuration loading and the query path.
#[derive(Error, Debug)]
pub enum Error {
    // Destination errors
    #[error("Destination '{destination}' failed: {message}")]
    Destination { destination: String, message: String },

    #[error("Destination '{destination}' does not support {operation}")]
    Unsupported {
        destination: String,
        operation: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a destination failure.
    pub fn destination(destination: &str, message: impl Into<String>) -> Self {
        Error::Destination {
            destination: destination.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a capability the destination does not have.
    pub fn unsupported(destination: &str, operation: &'static str) -> Self {
        Error::Unsupported {
            destination: destination.to_string(),
            operation,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
