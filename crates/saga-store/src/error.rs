//! Repository error types.

use correlation_store::StoreError;
use thiserror::Error;

use crate::serializer::SerializationError;

/// A saga type that cannot be used with the configured repository.
///
/// This is a programming or setup defect, not a runtime data issue.
#[derive(Debug, Error)]
#[error("saga type {saga_type} is misconfigured: {reason}")]
pub struct ConfigurationError {
    pub saga_type: &'static str,
    pub reason: String,
}

impl ConfigurationError {
    /// Creates a configuration error for the named saga type.
    pub fn new(saga_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            saga_type,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A public operation received an unusable argument; detected before
    /// any store access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The saga type cannot be constructed by the configured factory.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A persisted blob could not be parsed into the expected payload type.
    #[error("failed to deserialize state for saga type {saga_type}")]
    Deserialization {
        saga_type: &'static str,
        #[source]
        source: SerializationError,
    },

    /// A payload could not be serialized for persistence.
    #[error("failed to serialize state for saga type {saga_type}")]
    Serialization {
        saga_type: &'static str,
        #[source]
        source: SerializationError,
    },

    /// A failure surfaced by the underlying store or transaction,
    /// propagated unchanged after rollback.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
