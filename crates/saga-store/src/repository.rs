//! The saga state repository.

use std::time::Instant;

use common::CorrelationId;
use correlation_store::{
    CorrelationStore, CorrelationStoreExt, HeaderRecord, StateRecord, TransactionScope,
    TransactionScopeExt,
};

use crate::error::{RepositoryError, Result};
use crate::factory::SagaFactory;
use crate::saga::{Headers, Saga};
use crate::serializer::Serializer;

/// Stores, retrieves and deletes saga state keyed by correlation id.
///
/// A saga's persisted form is split across one state record (the payload
/// serialized to an opaque blob) and a set of header records. Every save
/// rewrites both inside a single transaction: the blob is replaced or
/// inserted, and the header set is deleted and reinserted wholesale.
///
/// The repository gives no exclusivity guarantee across concurrent calls
/// for the same correlation id. Two racing first saves both pass the
/// update probe; the state table's primary key rejects the loser with a
/// `DuplicateCorrelation` store error. Callers needing single-writer
/// semantics must serialize saves per correlation id above this layer.
pub struct SagaStateRepository<D, S, F>
where
    D: CorrelationStore,
    S: Serializer,
{
    store: D,
    factory: F,
    serializer: S,
}

impl<D, S, F> SagaStateRepository<D, S, F>
where
    D: CorrelationStore,
    S: Serializer,
{
    /// Creates a repository from its collaborators.
    pub fn new(store: D, factory: F, serializer: S) -> Self {
        Self {
            store,
            factory,
            serializer,
        }
    }

    /// Finds and rehydrates the saga stored under the correlation id.
    ///
    /// Returns `Ok(None)` when nothing is stored under the id; that is a
    /// normal outcome, not an error. Otherwise a fresh instance is
    /// obtained from the factory, its payload deserialized from the
    /// state blob, and its headers folded from the header records.
    #[tracing::instrument(skip(self), fields(saga_type = G::saga_type()))]
    pub async fn find<G>(&self, correlation_id: CorrelationId) -> Result<Option<G>>
    where
        G: Saga,
        F: SagaFactory<G>,
    {
        metrics::counter!("saga_finds_total").increment(1);
        Self::check_correlation_id(correlation_id)?;

        let Some(persisted) = self.store.state_record(correlation_id).await? else {
            return Ok(None);
        };

        let mut saga: G = self.factory.resolve()?;
        let payload: G::Payload = self.serializer.deserialize(&persisted.blob).map_err(
            |source| RepositoryError::Deserialization {
                saga_type: G::saga_type(),
                source,
            },
        )?;

        let headers = HeaderRecord::fold(self.store.header_records(correlation_id).await?);

        saga.set_correlation_id(correlation_id);
        saga.set_headers(headers);
        saga.set_payload(payload);
        Ok(Some(saga))
    }

    /// Persists the saga's payload and headers under its correlation id.
    ///
    /// The state record is updated in place when one exists and inserted
    /// otherwise (upsert-by-probe); the header set is fully replaced.
    /// On any failure the transaction is rolled back and the original
    /// error is returned unchanged.
    #[tracing::instrument(skip(self, saga), fields(saga_type = G::saga_type()))]
    pub async fn save<G>(&self, saga: &G) -> Result<()>
    where
        G: Saga,
    {
        metrics::counter!("saga_saves_total").increment(1);
        let started = Instant::now();

        let correlation_id = saga.correlation_id();
        Self::check_correlation_id(correlation_id)?;

        let blob = self.serializer.serialize(saga.payload()).map_err(|source| {
            RepositoryError::Serialization {
                saga_type: G::saga_type(),
                source,
            }
        })?;
        let record = StateRecord::new(correlation_id, blob);

        let mut tx = self.store.begin().await?;
        match Self::write(&mut tx, &record, saga.headers()).await {
            Ok(()) => tx.commit().await?,
            Err(err) => {
                Self::roll_back(tx, correlation_id).await;
                return Err(err);
            }
        }

        metrics::histogram!("saga_save_duration_seconds").record(started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Deletes the saga stored under the correlation id.
    ///
    /// Completing a correlation id with no stored records is a
    /// successful no-op.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, correlation_id: CorrelationId) -> Result<()> {
        metrics::counter!("saga_completions_total").increment(1);
        Self::check_correlation_id(correlation_id)?;

        let mut tx = self.store.begin().await?;
        match Self::erase(&mut tx, correlation_id).await {
            Ok(()) => tx.commit().await?,
            Err(err) => {
                Self::roll_back(tx, correlation_id).await;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Deletes the saga the instance identifies.
    pub async fn complete_saga<G: Saga>(&self, saga: &G) -> Result<()> {
        self.complete(saga.correlation_id()).await
    }

    fn check_correlation_id(id: CorrelationId) -> Result<()> {
        if id.is_nil() {
            return Err(RepositoryError::InvalidArgument(
                "correlation id must be non-nil".to_string(),
            ));
        }
        Ok(())
    }

    async fn write(tx: &mut D::Transaction, record: &StateRecord, headers: &Headers) -> Result<()> {
        let correlation_id = record.correlation_id;

        let updated = tx.update_state(record).await?;
        if updated == 0 {
            // No rows touched: first save for this correlation id
            tracing::debug!(%correlation_id, "no state record to update, inserting");
            tx.insert_state(record).await?;
        }

        tx.delete_headers(correlation_id).await?;
        for (key, value) in headers {
            tx.insert_header(&HeaderRecord::new(correlation_id, key.clone(), value.clone()))
                .await?;
        }
        Ok(())
    }

    async fn erase(tx: &mut D::Transaction, correlation_id: CorrelationId) -> Result<()> {
        tx.delete_headers(correlation_id).await?;
        tx.delete_state(correlation_id).await?;
        Ok(())
    }

    /// Rolls the transaction back. A rollback failure is logged and never
    /// replaces the error that triggered it.
    async fn roll_back(tx: D::Transaction, correlation_id: CorrelationId) {
        if let Err(rollback_err) = tx.rollback().await {
            tracing::warn!(%correlation_id, error = %rollback_err, "transaction rollback failed");
        }
    }
}
