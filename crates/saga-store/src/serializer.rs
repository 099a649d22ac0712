//! Payload serialization contract and the JSON implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A serializer failure, wrapping whatever the underlying format reported.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct SerializationError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl SerializationError {
    /// Wraps an underlying serializer failure.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Converts typed saga payloads to and from their opaque persisted form.
///
/// Implementations must round-trip exactly for every payload shape the
/// system persists. The target type is chosen statically by the caller,
/// so the trait is not object safe; the repository takes its serializer
/// as a type parameter.
pub trait Serializer: Send + Sync {
    /// Serializes a payload into its opaque blob form.
    fn serialize<T: Serialize>(&self, payload: &T) -> Result<String, SerializationError>;

    /// Deserializes a blob into the expected payload type.
    fn deserialize<T: DeserializeOwned>(&self, blob: &str) -> Result<T, SerializationError>;
}

/// Serializer backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Creates a new JSON serializer.
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, payload: &T) -> Result<String, SerializationError> {
        serde_json::to_string(payload).map_err(SerializationError::new)
    }

    fn deserialize<T: DeserializeOwned>(&self, blob: &str) -> Result<T, SerializationError> {
        serde_json::from_str(blob).map_err(SerializationError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        step: String,
        attempts: u32,
    }

    #[test]
    fn json_round_trip() {
        let serializer = JsonSerializer::new();
        let payload = Payload {
            step: "start".to_string(),
            attempts: 3,
        };

        let blob = serializer.serialize(&payload).unwrap();
        let back: Payload = serializer.deserialize(&blob).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn deserialize_rejects_mismatched_shape() {
        let serializer = JsonSerializer::new();
        let result: Result<Payload, _> = serializer.deserialize(r#"{"step": 42}"#);
        assert!(result.is_err());
    }
}
