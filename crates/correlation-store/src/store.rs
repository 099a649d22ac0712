use async_trait::async_trait;
use common::CorrelationId;

use crate::record::{CorrelationRecord, HeaderRecord, StateRecord};
use crate::Result;

/// Read access to one record kind, outside any transaction.
#[async_trait]
pub trait RecordRead<T: CorrelationRecord> {
    /// Returns all records of this kind matching the correlation id.
    ///
    /// Multiple records are expected for headers; at most one is
    /// semantically expected for state.
    async fn get_by_correlation_id(&self, id: CorrelationId) -> Result<Vec<T>>;
}

/// Mutations of one record kind, issued through an open transaction.
#[async_trait]
pub trait TransactionOps<T: CorrelationRecord> {
    /// Returns all records of this kind matching the correlation id,
    /// including uncommitted changes made through this scope.
    async fn get_by_correlation_id(&mut self, id: CorrelationId) -> Result<Vec<T>>;

    /// Replaces the fields of the first existing record matching
    /// `record`'s correlation id. Returns the number of rows affected
    /// (0 or 1); never creates a new record.
    async fn update(&mut self, record: &T) -> Result<u64>;

    /// Creates a new record unconditionally. The store's own uniqueness
    /// constraints apply.
    async fn insert(&mut self, record: &T) -> Result<()>;

    /// Removes records matching `record` field-for-field. Removing a
    /// non-existent record is a no-op, not an error.
    async fn delete(&mut self, record: &T) -> Result<u64>;

    /// Removes every record of this kind for the correlation id.
    async fn delete_by_correlation_id(&mut self, id: CorrelationId) -> Result<u64>;
}

/// An atomic unit of work spanning multiple record operations.
///
/// `commit` and `rollback` consume the scope, so a second terminal call
/// cannot be expressed. Dropping a scope without committing discards its
/// operations.
#[async_trait]
pub trait TransactionScope:
    TransactionOps<StateRecord> + TransactionOps<HeaderRecord> + Send
{
    /// Makes all operations issued through this scope durable.
    async fn commit(self) -> Result<()>;

    /// Discards all operations issued through this scope.
    async fn rollback(self) -> Result<()>;
}

/// Raw accessor over the two record kinds, keyed by correlation id.
///
/// Carries no business logic. All implementations must be thread-safe
/// (Send + Sync); mutations go through [`TransactionScope`]s obtained
/// from [`begin`](CorrelationStore::begin).
#[async_trait]
pub trait CorrelationStore:
    RecordRead<StateRecord> + RecordRead<HeaderRecord> + Send + Sync
{
    /// The transaction scope type produced by `begin`.
    type Transaction: TransactionScope;

    /// Begins a unit of work spanning multiple record operations.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// Extension trait providing convenience methods for correlation stores.
#[async_trait]
pub trait CorrelationStoreExt: CorrelationStore {
    /// Returns the state record for the correlation id, if one exists.
    async fn state_record(&self, id: CorrelationId) -> Result<Option<StateRecord>> {
        let records = <Self as RecordRead<StateRecord>>::get_by_correlation_id(self, id).await?;
        Ok(records.into_iter().next())
    }

    /// Returns all header records for the correlation id in insertion order.
    async fn header_records(&self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        <Self as RecordRead<HeaderRecord>>::get_by_correlation_id(self, id).await
    }
}

// Blanket implementation for all CorrelationStore implementations
impl<S: CorrelationStore + ?Sized> CorrelationStoreExt for S {}

/// Extension trait with per-kind named helpers for transaction scopes.
///
/// The two `TransactionOps` supertraits share method names, so bare method
/// calls on a scope are ambiguous; these helpers pick the record kind.
#[async_trait]
pub trait TransactionScopeExt: TransactionScope {
    /// Returns the state record for the correlation id, if one exists.
    async fn state_record(&mut self, id: CorrelationId) -> Result<Option<StateRecord>> {
        let records =
            <Self as TransactionOps<StateRecord>>::get_by_correlation_id(self, id).await?;
        Ok(records.into_iter().next())
    }

    /// Replaces an existing state record's blob; 0 rows affected means
    /// no record exists for the correlation id.
    async fn update_state(&mut self, record: &StateRecord) -> Result<u64> {
        <Self as TransactionOps<StateRecord>>::update(self, record).await
    }

    /// Inserts a new state record.
    async fn insert_state(&mut self, record: &StateRecord) -> Result<()> {
        <Self as TransactionOps<StateRecord>>::insert(self, record).await
    }

    /// Removes the state record for the correlation id.
    async fn delete_state(&mut self, id: CorrelationId) -> Result<u64> {
        <Self as TransactionOps<StateRecord>>::delete_by_correlation_id(self, id).await
    }

    /// Returns all header records for the correlation id in insertion order.
    async fn header_records(&mut self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        <Self as TransactionOps<HeaderRecord>>::get_by_correlation_id(self, id).await
    }

    /// Inserts a new header record.
    async fn insert_header(&mut self, record: &HeaderRecord) -> Result<()> {
        <Self as TransactionOps<HeaderRecord>>::insert(self, record).await
    }

    /// Removes every header record for the correlation id.
    async fn delete_headers(&mut self, id: CorrelationId) -> Result<u64> {
        <Self as TransactionOps<HeaderRecord>>::delete_by_correlation_id(self, id).await
    }
}

// Blanket implementation for all TransactionScope implementations
impl<T: TransactionScope + ?Sized> TransactionScopeExt for T {}
