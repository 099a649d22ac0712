pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::CorrelationId;
pub use error::{Result, StoreError};
pub use memory::{InMemoryCorrelationStore, InMemoryTransactionScope};
pub use postgres::{PgTransactionScope, PostgresCorrelationStore};
pub use record::{CorrelationRecord, HeaderRecord, StateRecord};
pub use store::{
    CorrelationStore, CorrelationStoreExt, RecordRead, TransactionOps, TransactionScope,
    TransactionScopeExt,
};
