//! Saga capability contract.

use std::collections::HashMap;

use common::CorrelationId;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Key/value metadata attached to a saga instance, fully replaced on
/// every save.
pub type Headers = HashMap<String, String>;

/// Capability contract every persistable saga type implements.
///
/// The repository binds to these accessors. Only the correlation id, the
/// headers, and the payload are persisted; any other saga fields live and
/// die with the in-memory instance.
pub trait Saga: Send {
    /// The payload persisted as the saga's state blob.
    type Payload: Serialize + DeserializeOwned + Send + Sync;

    /// Saga type name, used in error reporting and log fields.
    fn saga_type() -> &'static str;

    /// The correlation id identifying this instance.
    fn correlation_id(&self) -> CorrelationId;

    /// Sets the correlation id when rehydrating a stored instance.
    fn set_correlation_id(&mut self, id: CorrelationId);

    /// The headers attached to this instance.
    fn headers(&self) -> &Headers;

    /// Replaces the headers when rehydrating a stored instance.
    fn set_headers(&mut self, headers: Headers);

    /// The internal payload.
    fn payload(&self) -> &Self::Payload;

    /// Replaces the payload when rehydrating a stored instance.
    fn set_payload(&mut self, payload: Self::Payload);
}
