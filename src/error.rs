//! Error types for the Vertica Backup Operator

use thiserror::Error;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Optimistic concurrency failure on a status write
    #[error("Conflict writing status: {0}")]
    Conflict(String),

    /// The reconcile was cancelled before it finished
    #[error("Reconcile cancelled")]
    Cancelled,

    /// A phase change the lifecycle does not allow
    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Object is missing metadata the operation needs
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a missing metadata error
    pub fn missing_metadata(msg: impl Into<String>) -> Self {
        Error::MissingMetadata(msg.into())
    }

    /// True when the API server answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// True for a stale resourceVersion on a conditional write
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict(_) => true,
            Error::Kube(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }

    /// Convert a write failure, mapping HTTP 409 to [`Error::Conflict`]
    pub fn from_write(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 409 => Error::Conflict(resp.message),
            other => Error::Kube(other),
        }
    }
}
