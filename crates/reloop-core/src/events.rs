//! Outbound event types.
//!
//! An [`OutboundEvent`] is the unit of delivery: a small open-ended
//! `kind` tag, an opaque JSON payload, and the creation timestamp.
//! Events are transient — never persisted, queued, or retried. They
//! exist only for the duration of one dispatch call, and a connection
//! that is absent at publish time simply never sees them.
//!
//! The timestamp is set when the event is constructed, not when it is
//! delivered.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event kind tags.
///
/// The set is open-ended: callers may publish any kind string. These
/// constants cover the kinds the service itself produces.
pub mod kind {
    /// Ordinary user-facing notification.
    pub const NOTIFICATION: &str = "NOTIFICATION";
    /// Complaint ticket state change.
    pub const COMPLAINT_UPDATE: &str = "COMPLAINT_UPDATE";
    /// Platform-wide alert.
    pub const SYSTEM_ALERT: &str = "SYSTEM_ALERT";
    /// Synthetic liveness pulse broadcast.
    pub const HEARTBEAT: &str = "HEARTBEAT";
    /// Synthetic acknowledgement pushed as the first event of every
    /// subscription.
    pub const CONNECTED: &str = "CONNECTED";
}

/// One event pushed to subscribed clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    /// Event kind tag (see [`kind`]). Used as the SSE event name.
    pub kind: String,
    /// Opaque application payload, serialized at the transport boundary.
    pub payload: Value,
    /// ISO 8601 creation time.
    pub timestamp: String,
}

impl OutboundEvent {
    /// Create an event with the current UTC timestamp.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a [`kind::NOTIFICATION`] event.
    #[must_use]
    pub fn notification(payload: Value) -> Self {
        Self::new(kind::NOTIFICATION, payload)
    }

    /// Create the synthetic [`kind::HEARTBEAT`] pulse event.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(kind::HEARTBEAT, Value::String("ping".to_owned()))
    }

    /// Create the synthetic [`kind::CONNECTED`] acknowledgement pushed
    /// to a freshly registered connection.
    #[must_use]
    pub fn connected_ack(client_id: &str) -> Self {
        Self::new(
            kind::CONNECTED,
            serde_json::json!({ "clientId": client_id }),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_sets_timestamp() {
        let e = OutboundEvent::new("SYSTEM_ALERT", json!({"msg": "maintenance"}));
        assert_eq!(e.kind, "SYSTEM_ALERT");
        assert!(!e.timestamp.is_empty());
        // RFC 3339 timestamps parse back.
        assert!(chrono::DateTime::parse_from_rfc3339(&e.timestamp).is_ok());
    }

    #[test]
    fn serde_camel_case_fields() {
        let e = OutboundEvent::notification(json!({"taskId": 7}));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "NOTIFICATION");
        assert_eq!(v["payload"]["taskId"], 7);
        assert!(v.get("timestamp").is_some());
    }

    #[test]
    fn serde_roundtrip() {
        let e = OutboundEvent::new(kind::COMPLAINT_UPDATE, json!({"complaintId": "c-9"}));
        let json = serde_json::to_string(&e).unwrap();
        let back: OutboundEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn heartbeat_event() {
        let e = OutboundEvent::heartbeat();
        assert_eq!(e.kind, kind::HEARTBEAT);
        assert_eq!(e.payload, json!("ping"));
    }

    #[test]
    fn connected_ack_carries_client_id() {
        let e = OutboundEvent::connected_ack("314");
        assert_eq!(e.kind, kind::CONNECTED);
        assert_eq!(e.payload["clientId"], "314");
    }

    #[test]
    fn custom_kind_allowed() {
        // The kind set is open-ended by design.
        let e = OutboundEvent::new("PICKUP_ASSIGNED", json!({"taskId": 12}));
        assert_eq!(e.kind, "PICKUP_ASSIGNED");
    }
}
