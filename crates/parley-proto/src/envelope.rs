//! JSON event envelope.
//!
//! Every text frame on the channel is a single envelope: the event name plus
//! an untyped `data` object. Typed decoding happens in [`crate::payloads`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// A named event with its raw JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name (e.g. `chat_message`).
    pub event: String,
    /// Event payload. `Null` for events without one.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Envelope {
    /// Create an envelope.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Decode an envelope from a text frame.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Encode the envelope as a text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_without_data() {
        let envelope = Envelope::decode(r#"{"event":"connect"}"#).unwrap();
        assert_eq!(envelope.event, "connect");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn encode_skips_null_data() {
        let envelope = Envelope::new("ping", Value::Null);
        assert_eq!(envelope.encode().unwrap(), r#"{"event":"ping"}"#);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(Envelope::decode("not json"), Err(ProtocolError::MalformedEnvelope(_))));
        assert!(matches!(
            Envelope::decode(r#"{"data":{}}"#),
            Err(ProtocolError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn decode_keeps_payload() {
        let envelope = Envelope::decode(r#"{"event":"system","data":{"msg":"hi"}}"#).unwrap();
        assert_eq!(envelope.data, json!({ "msg": "hi" }));
    }
}
