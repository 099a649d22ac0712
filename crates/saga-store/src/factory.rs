//! Saga construction contract.

use crate::error::ConfigurationError;
use crate::saga::Saga;

/// Constructs empty saga instances for the repository to populate.
///
/// The factory only produces a fresh object to rehydrate into; it must
/// not perform I/O. The repository receives its factory as an explicit
/// collaborator at construction.
pub trait SagaFactory<G: Saga>: Send + Sync {
    /// Returns a fresh, unpopulated instance of the saga type.
    fn resolve(&self) -> Result<G, ConfigurationError>;
}

/// Factory that builds saga instances through their `Default` impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSagaFactory;

impl DefaultSagaFactory {
    /// Creates a new default-based factory.
    pub fn new() -> Self {
        Self
    }
}

impl<G: Saga + Default> SagaFactory<G> for DefaultSagaFactory {
    fn resolve(&self) -> Result<G, ConfigurationError> {
        Ok(G::default())
    }
}
