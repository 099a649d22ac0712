//! Durable storage for saga state and metadata headers.
//!
//! A saga is a long-running, interruptible unit of work identified by a
//! correlation id. This crate persists each saga as two co-located record
//! sets: one opaque serialized state blob and a set of string key/value
//! headers. [`SagaStateRepository`] is the only entry point callers use;
//! it routes (de)serialization and saga construction through pluggable
//! collaborators and wraps every multi-statement write in one transaction.

pub mod error;
pub mod factory;
pub mod repository;
pub mod saga;
pub mod serializer;

pub use common::CorrelationId;
pub use error::{ConfigurationError, RepositoryError, Result};
pub use factory::{DefaultSagaFactory, SagaFactory};
pub use repository::SagaStateRepository;
pub use saga::{Headers, Saga};
pub use serializer::{JsonSerializer, SerializationError, Serializer};
