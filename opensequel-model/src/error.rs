//! Error types for model operations.

use serde_json::Value;
use thiserror::Error;

/// Model error type.
///
/// HTTP failures are classified once, when the raw outcome is normalized,
/// and travel unchanged to the caller from there.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The engine answered 401.
    #[error("Unauthorized")]
    Unauthorized,

    /// The document does not exist.
    #[error("Document not found: {index}/{id}")]
    NotFound {
        /// Index name.
        index: String,
        /// Document ID.
        id: String,
    },

    /// The engine rejected the request and explained why in `root_cause`.
    #[error("{reason}")]
    Engine {
        /// HTTP status code.
        status: u16,
        /// `error.root_cause[0].reason` from the engine's response.
        reason: String,
    },

    /// Non-2xx response without a recognizable engine error body.
    #[error("Request failed with status code {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body as received.
        body: Value,
    },

    /// A where-clause value that is not a known filter shape.
    #[error("Unsupported filter on field `{field}`: {reason}")]
    UnsupportedFilter {
        /// Field the filter was attached to.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The connection already has a transport bound.
    #[error("Connection already configured")]
    AlreadyConfigured,

    /// An operation ran before the connection was configured.
    #[error("Connection not configured")]
    NotConnected,

    /// Invalid connection configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A 2xx response that is missing fields the operation needs.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure below HTTP (connect, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(#[from] opensearch::Error),
}

impl ModelError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ModelError::Unauthorized => Some(401),
            ModelError::NotFound { .. } => Some(404),
            ModelError::Engine { status, .. } | ModelError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
