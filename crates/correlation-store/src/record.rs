use std::collections::HashMap;

use common::CorrelationId;

/// A persistable record kind grouped by correlation id.
///
/// Implemented by the two record shapes the store knows about. The store
/// contract is generic over this trait rather than naming record types in
/// its method signatures.
pub trait CorrelationRecord: Clone + Send + Sync + 'static {
    /// The correlation id grouping this record with its saga.
    fn correlation_id(&self) -> CorrelationId;
}

/// The opaque serialized state of a saga.
///
/// At most one exists per correlation id; the correlation id is the
/// primary key and never changes once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub correlation_id: CorrelationId,
    pub blob: String,
}

impl StateRecord {
    /// Creates a state record from a correlation id and serialized blob.
    pub fn new(correlation_id: CorrelationId, blob: impl Into<String>) -> Self {
        Self {
            correlation_id,
            blob: blob.into(),
        }
    }
}

impl CorrelationRecord for StateRecord {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

/// One key/value metadata entry attached to a saga.
///
/// Zero or more exist per correlation id. Key uniqueness is not enforced
/// at the record level; duplicates are resolved by [`HeaderRecord::fold`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub correlation_id: CorrelationId,
    pub key: String,
    pub value: String,
}

impl HeaderRecord {
    /// Creates a header record.
    pub fn new(
        correlation_id: CorrelationId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Folds header records into a key/value map in the order given.
    ///
    /// Stores return header records in insertion order, so for duplicate
    /// keys the most recently inserted record wins.
    pub fn fold(records: impl IntoIterator<Item = HeaderRecord>) -> HashMap<String, String> {
        records.into_iter().map(|r| (r.key, r.value)).collect()
    }
}

impl CorrelationRecord for HeaderRecord {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_empty_is_empty() {
        assert!(HeaderRecord::fold([]).is_empty());
    }

    #[test]
    fn fold_keeps_distinct_keys() {
        let id = CorrelationId::new();
        let folded = HeaderRecord::fold([
            HeaderRecord::new(id, "stage", "init"),
            HeaderRecord::new(id, "owner", "billing"),
        ]);

        assert_eq!(folded.len(), 2);
        assert_eq!(folded.get("stage").map(String::as_str), Some("init"));
        assert_eq!(folded.get("owner").map(String::as_str), Some("billing"));
    }

    #[test]
    fn fold_last_record_wins_for_duplicate_keys() {
        let id = CorrelationId::new();
        let folded = HeaderRecord::fold([
            HeaderRecord::new(id, "k", "1"),
            HeaderRecord::new(id, "k", "2"),
        ]);

        assert_eq!(folded.len(), 1);
        assert_eq!(folded.get("k").map(String::as_str), Some("2"));
    }
}
