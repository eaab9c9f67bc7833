use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format for a domain event as it travels through the broker.
///
/// Events are immutable once published and are not persisted independently:
/// the stream is a notification mechanism, and consumers re-derive state
/// from the authoritative store rather than from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Dot-namespaced event type, doubling as the routing key
    /// (e.g. `note.created`).
    pub event_type: String,

    /// Event payload. Opaque at the transport layer; decoded into a typed
    /// variant at the consumer boundary.
    pub data: serde_json::Value,

    /// When the event was published.
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Creates an envelope stamped with the current time.
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Serializes a typed payload into an envelope.
    pub fn from_payload<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_value(payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_camel_case_field_names() {
        let envelope = EventEnvelope::new("note.created", serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["eventType"], "note.created");
        assert_eq!(json["data"]["id"], 1);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn envelope_roundtrip() {
        let envelope = EventEnvelope::new("note.deleted", serde_json::json!({"id": 9}));
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(back.event_type, envelope.event_type);
        assert_eq!(back.data, envelope.data);
        assert_eq!(back.timestamp, envelope.timestamp);
    }

    #[test]
    fn envelope_timestamp_is_iso8601() {
        let json = r#"{"eventType":"note.viewed","data":{},"timestamp":"2024-05-01T12:00:00Z"}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.event_type, "note.viewed");
    }
}
