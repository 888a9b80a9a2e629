//! Envelope - the unit exchanged over a channel.
//!
//! An envelope is one of three classes, derived from its fields:
//! - **Event**: no correlation id (fire-and-forget or lifecycle notification)
//! - **Request**: correlation id, plain kind
//! - **Response**: correlation id, kind carrying the response marker

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::CorrelationId;

/// Suffix appended to a request kind to mark its response.
pub const RESPONSE_MARKER: &str = ":response";

/// Envelope class, used by the wire codec as the frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeClass {
    Event,
    Request,
    Response,
}

/// One message unit exchanged with the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub kind: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl Envelope {
    pub fn event(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            correlation_id: None,
        }
    }

    pub fn request(kind: impl Into<String>, payload: Value, id: CorrelationId) -> Self {
        Self {
            kind: kind.into(),
            payload,
            correlation_id: Some(id),
        }
    }

    /// Build the response to a request of `request_kind`.
    pub fn response(request_kind: &str, payload: Value, id: CorrelationId) -> Self {
        Self {
            kind: format!("{request_kind}{RESPONSE_MARKER}"),
            payload,
            correlation_id: Some(id),
        }
    }

    pub fn is_response(&self) -> bool {
        self.kind.ends_with(RESPONSE_MARKER)
    }

    pub fn class(&self) -> EnvelopeClass {
        match (&self.correlation_id, self.is_response()) {
            (None, _) => EnvelopeClass::Event,
            (Some(_), false) => EnvelopeClass::Request,
            (Some(_), true) => EnvelopeClass::Response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_omits_correlation_id() {
        let env = Envelope::event("tab.set", json!("#general"));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire, json!({"kind": "tab.set", "payload": "#general"}));
        assert_eq!(env.class(), EnvelopeClass::Event);
    }

    #[test]
    fn test_response_carries_marker_and_id() {
        let id = CorrelationId::new();
        let env = Envelope::response("i18n.cache", json!({}), id.clone());
        assert_eq!(env.kind, "i18n.cache:response");
        assert!(env.is_response());
        assert_eq!(env.class(), EnvelopeClass::Response);

        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire["correlationId"], json!(id.as_str()));
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let env: Envelope = serde_json::from_str(r#"{"kind":"options.init"}"#).unwrap();
        assert_eq!(env.payload, Value::Null);
        assert!(env.correlation_id.is_none());
    }
}
