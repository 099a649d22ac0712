use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::CorrelationId;
use tokio::sync::RwLock;

use crate::{
    HeaderRecord, Result, StateRecord, StoreError,
    store::{CorrelationStore, RecordRead, TransactionOps, TransactionScope},
};

/// In-memory correlation store implementation for testing.
///
/// Records live in plain vectors behind an async RwLock. Header records
/// keep insertion order, which fixes the fold order for duplicate keys.
/// Like the PostgreSQL implementation, state records are unique per
/// correlation id and a conflicting insert is rejected.
#[derive(Clone, Default)]
pub struct InMemoryCorrelationStore {
    tables: Arc<RwLock<Tables>>,
    fail_on_header_insert: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    state: Vec<StateRecord>,
    headers: Vec<HeaderRecord>,
}

impl InMemoryCorrelationStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of state records stored.
    pub async fn state_count(&self) -> usize {
        self.tables.read().await.state.len()
    }

    /// Returns the total number of header records stored.
    pub async fn header_count(&self) -> usize {
        self.tables.read().await.headers.len()
    }

    /// Makes subsequent header inserts fail until cleared, so tests can
    /// exercise mid-transaction failure paths.
    pub fn set_fail_on_header_insert(&self, fail: bool) {
        self.fail_on_header_insert.store(fail, Ordering::SeqCst);
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.state.clear();
        tables.headers.clear();
    }
}

#[async_trait]
impl RecordRead<StateRecord> for InMemoryCorrelationStore {
    async fn get_by_correlation_id(&self, id: CorrelationId) -> Result<Vec<StateRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .state
            .iter()
            .filter(|r| r.correlation_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordRead<HeaderRecord> for InMemoryCorrelationStore {
    async fn get_by_correlation_id(&self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .headers
            .iter()
            .filter(|r| r.correlation_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    type Transaction = InMemoryTransactionScope;

    async fn begin(&self) -> Result<InMemoryTransactionScope> {
        let working = self.tables.read().await.clone();
        Ok(InMemoryTransactionScope {
            shared: Arc::clone(&self.tables),
            working,
            fail_on_header_insert: Arc::clone(&self.fail_on_header_insert),
        })
    }
}

/// Transaction scope over the in-memory store.
///
/// Takes a copy of the tables at begin, applies operations to the copy,
/// and publishes it wholesale at commit. Concurrent scopes are therefore
/// last-committed-wins; the PostgreSQL implementation is the one with a
/// real isolation story.
pub struct InMemoryTransactionScope {
    shared: Arc<RwLock<Tables>>,
    working: Tables,
    fail_on_header_insert: Arc<AtomicBool>,
}

#[async_trait]
impl TransactionOps<StateRecord> for InMemoryTransactionScope {
    async fn get_by_correlation_id(&mut self, id: CorrelationId) -> Result<Vec<StateRecord>> {
        Ok(self
            .working
            .state
            .iter()
            .filter(|r| r.correlation_id == id)
            .cloned()
            .collect())
    }

    async fn update(&mut self, record: &StateRecord) -> Result<u64> {
        match self
            .working
            .state
            .iter_mut()
            .find(|r| r.correlation_id == record.correlation_id)
        {
            Some(existing) => {
                *existing = record.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert(&mut self, record: &StateRecord) -> Result<()> {
        if self
            .working
            .state
            .iter()
            .any(|r| r.correlation_id == record.correlation_id)
        {
            return Err(StoreError::DuplicateCorrelation(record.correlation_id));
        }
        self.working.state.push(record.clone());
        Ok(())
    }

    async fn delete(&mut self, record: &StateRecord) -> Result<u64> {
        let before = self.working.state.len();
        self.working.state.retain(|r| r != record);
        Ok((before - self.working.state.len()) as u64)
    }

    async fn delete_by_correlation_id(&mut self, id: CorrelationId) -> Result<u64> {
        let before = self.working.state.len();
        self.working.state.retain(|r| r.correlation_id != id);
        Ok((before - self.working.state.len()) as u64)
    }
}

#[async_trait]
impl TransactionOps<HeaderRecord> for InMemoryTransactionScope {
    async fn get_by_correlation_id(&mut self, id: CorrelationId) -> Result<Vec<HeaderRecord>> {
        Ok(self
            .working
            .headers
            .iter()
            .filter(|r| r.correlation_id == id)
            .cloned()
            .collect())
    }

    async fn update(&mut self, record: &HeaderRecord) -> Result<u64> {
        match self
            .working
            .headers
            .iter_mut()
            .find(|r| r.correlation_id == record.correlation_id)
        {
            Some(existing) => {
                *existing = record.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert(&mut self, record: &HeaderRecord) -> Result<()> {
        if self.fail_on_header_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(
                "header insert failure injected".to_string(),
            ));
        }
        self.working.headers.push(record.clone());
        Ok(())
    }

    async fn delete(&mut self, record: &HeaderRecord) -> Result<u64> {
        let before = self.working.headers.len();
        self.working.headers.retain(|r| r != record);
        Ok((before - self.working.headers.len()) as u64)
    }

    async fn delete_by_correlation_id(&mut self, id: CorrelationId) -> Result<u64> {
        let before = self.working.headers.len();
        self.working.headers.retain(|r| r.correlation_id != id);
        Ok((before - self.working.headers.len()) as u64)
    }
}

#[async_trait]
impl TransactionScope for InMemoryTransactionScope {
    async fn commit(self) -> Result<()> {
        *self.shared.write().await = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        // The working copy is simply dropped; nothing was published.
        Ok(())
    }
}
