use async_trait::async_trait;
use common::CorrelationId;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    HeaderRecord, Result, StateRecord, StoreError,
    store::{CorrelationStore, RecordRead, TransactionOps, TransactionScope},
};

/// PostgreSQL-backed correlation store.
///
/// State records are keyed by the `saga_state` primary key, so a racing
/// insert for the same correlation id surfaces as
/// [`StoreError::DuplicateCorrelation`]. Header reads are ordered by the
/// `seq` column, which fixes the fold order for duplicate keys.
#[derive(Clone)]
pub struct PostgresCorrelationStore {
    pool: PgPool,
}

impl PostgresCorrelationStore {
    /// Creates a new PostgreSQL correlation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_state(row: PgRow) -> Result<StateRecord> {
        Ok(StateRecord {
            correlation_id: CorrelationId::from_uuid(row.try_get::<Uuid, _>("correlation_id")?),
            blob: row.try_get("blob_data")?,
        })
    }

    fn row_to_header(row: PgRow) -> Result<HeaderRecord> {
        Ok(HeaderRecord {
            correlation_id: CorrelationId::from_uuid(row.try_get::<Uuid, _>("correlation_id")?),
            key: row.try_get("key")?,
            value: row.try_get("value")?,
        })
    }
}

#[async_trait]
impl RecordRead<StateRecord> for PostgresCorrelationStore {
    async fn get_by_correlation_id(&self, id: CorrelationId) -> Result<Vec<StateRecord>> {
        let rows = sqlx::query(
            "SELECT correlation_id, blob_data FROM saga_state WHERE correlation_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_state).collect()
    }
}

#[async_trait]
impl RecordRead<HeaderRecord> for PostgresCorrelationStore {
    async fn get_by_correlation_id(&self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT correlation_id, key, value
            FROM saga_headers
            WHERE correlation_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_header).collect()
    }
}

#[async_trait]
impl CorrelationStore for PostgresCorrelationStore {
    type Transaction = PgTransactionScope;

    async fn begin(&self) -> Result<PgTransactionScope> {
        tracing::debug!("beginning saga store transaction");
        let tx = self.pool.begin().await?;
        Ok(PgTransactionScope { tx })
    }
}

/// Transaction scope over a pooled PostgreSQL connection.
///
/// Dropping the scope without committing rolls the transaction back.
pub struct PgTransactionScope {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionOps<StateRecord> for PgTransactionScope {
    async fn get_by_correlation_id(&mut self, id: CorrelationId) -> Result<Vec<StateRecord>> {
        let rows = sqlx::query(
            "SELECT correlation_id, blob_data FROM saga_state WHERE correlation_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(PostgresCorrelationStore::row_to_state)
            .collect()
    }

    async fn update(&mut self, record: &StateRecord) -> Result<u64> {
        let done = sqlx::query("UPDATE saga_state SET blob_data = $2 WHERE correlation_id = $1")
            .bind(record.correlation_id.as_uuid())
            .bind(&record.blob)
            .execute(&mut *self.tx)
            .await?;

        Ok(done.rows_affected())
    }

    async fn insert(&mut self, record: &StateRecord) -> Result<()> {
        sqlx::query("INSERT INTO saga_state (correlation_id, blob_data) VALUES ($1, $2)")
            .bind(record.correlation_id.as_uuid())
            .bind(&record.blob)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                // Primary key violation means a concurrent save won the insert race
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("saga_state_pkey")
                {
                    return StoreError::DuplicateCorrelation(record.correlation_id);
                }
                StoreError::Database(e)
            })?;

        Ok(())
    }

    async fn delete(&mut self, record: &StateRecord) -> Result<u64> {
        let done =
            sqlx::query("DELETE FROM saga_state WHERE correlation_id = $1 AND blob_data = $2")
                .bind(record.correlation_id.as_uuid())
                .bind(&record.blob)
                .execute(&mut *self.tx)
                .await?;

        Ok(done.rows_affected())
    }

    async fn delete_by_correlation_id(&mut self, id: CorrelationId) -> Result<u64> {
        let done = sqlx::query("DELETE FROM saga_state WHERE correlation_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(done.rows_affected())
    }
}

#[async_trait]
impl TransactionOps<HeaderRecord> for PgTransactionScope {
    async fn get_by_correlation_id(&mut self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT correlation_id, key, value
            FROM saga_headers
            WHERE correlation_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(PostgresCorrelationStore::row_to_header)
            .collect()
    }

    async fn update(&mut self, record: &HeaderRecord) -> Result<u64> {
        // Matches the contract's "first record for the correlation id":
        // the lowest seq is the oldest surviving header row.
        let done = sqlx::query(
            r#"
            UPDATE saga_headers SET key = $2, value = $3
            WHERE seq = (SELECT MIN(seq) FROM saga_headers WHERE correlation_id = $1)
            "#,
        )
        .bind(record.correlation_id.as_uuid())
        .bind(&record.key)
        .bind(&record.value)
        .execute(&mut *self.tx)
        .await?;

        Ok(done.rows_affected())
    }

    async fn insert(&mut self, record: &HeaderRecord) -> Result<()> {
        sqlx::query("INSERT INTO saga_headers (correlation_id, key, value) VALUES ($1, $2, $3)")
            .bind(record.correlation_id.as_uuid())
            .bind(&record.key)
            .bind(&record.value)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete(&mut self, record: &HeaderRecord) -> Result<u64> {
        let done = sqlx::query(
            "DELETE FROM saga_headers WHERE correlation_id = $1 AND key = $2 AND value = $3",
        )
        .bind(record.correlation_id.as_uuid())
        .bind(&record.key)
        .bind(&record.value)
        .execute(&mut *self.tx)
        .await?;

        Ok(done.rows_affected())
    }

    async fn delete_by_correlation_id(&mut self, id: CorrelationId) -> Result<u64> {
        let done = sqlx::query("DELETE FROM saga_headers WHERE correlation_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(done.rows_affected())
    }
}

#[async_trait]
impl TransactionScope for PgTransactionScope {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
