//! JSON wire codec.
//!
//! The gateway exchanges one JSON object per transport frame. Encoding a
//! typed event cannot produce invalid JSON, but the error is surfaced
//! anyway so callers never panic on a pathological payload.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::event::{ClientEvent, ServerEvent};

/// Errors from wire encoding/decoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// Event could not be serialized to the wire dialect.
    #[error("wire encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Incoming frame was not a known event.
    #[error("wire decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

fn encode<T: Serialize>(value: &T) -> Result<String, WireError> {
    serde_json::to_string(value).map_err(WireError::Encode)
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, WireError> {
    serde_json::from_str(text).map_err(WireError::Decode)
}

impl ClientEvent {
    /// Serialize to a wire frame.
    pub fn to_wire(&self) -> Result<String, WireError> {
        encode(self)
    }

    /// Parse a wire frame (gateway side; used by test harnesses).
    pub fn from_wire(text: &str) -> Result<Self, WireError> {
        decode(text)
    }
}

impl ServerEvent {
    /// Serialize to a wire frame (gateway side; used by test harnesses).
    pub fn to_wire(&self) -> Result<String, WireError> {
        encode(self)
    }

    /// Parse a wire frame.
    pub fn from_wire(text: &str) -> Result<Self, WireError> {
        decode(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::{Just, Strategy, any, prop_oneof, proptest};

    use super::*;
    use crate::{
        event::{ErrorKind, ErrorNotice, OutboundMessage, PresenceEntry},
        message::MessageKind,
    };

    #[test]
    fn unknown_event_name_is_a_decode_error() {
        let result = ServerEvent::from_wire(r#"{"event":"shrug","data":{}}"#);
        assert!(matches!(result, Err(WireError::Decode(_))));
    }

    #[test]
    fn truncated_frame_is_a_decode_error() {
        let result = ServerEvent::from_wire(r#"{"event":"new-mess"#);
        assert!(matches!(result, Err(WireError::Decode(_))));
    }

    #[test]
    fn payload_type_mismatch_is_a_decode_error() {
        // user-typing payload under the online-status name
        let result =
            ServerEvent::from_wire(r#"{"event":"online-status","data":{"userId":"u"}}"#);
        assert!(matches!(result, Err(WireError::Decode(_))));
    }

    fn arb_client_event() -> impl Strategy<Value = ClientEvent> {
        let id = "[a-z0-9-]{1,16}";
        prop_oneof![
            id.prop_map(|match_id| ClientEvent::JoinMatch { match_id }),
            id.prop_map(|match_id| ClientEvent::LeaveMatch { match_id }),
            (id, any::<String>(), prop_oneof![Just(MessageKind::Text), Just(MessageKind::Image)])
                .prop_map(|(match_id, content, kind)| {
                    ClientEvent::SendMessage(OutboundMessage { match_id, content, kind })
                }),
            (id, proptest::collection::vec(id, 0..4)).prop_map(|(match_id, message_ids)| {
                ClientEvent::MarkAsRead { match_id, message_ids }
            }),
            id.prop_map(|match_id| ClientEvent::TypingStart { match_id }),
            id.prop_map(|match_id| ClientEvent::TypingStop { match_id }),
            Just(ClientEvent::Heartbeat),
        ]
    }

    proptest! {
        #[test]
        fn client_event_round_trips(event in arb_client_event()) {
            let wire = event.to_wire().unwrap();
            let decoded = ClientEvent::from_wire(&wire).unwrap();
            assert_eq!(event, decoded);
        }
    }

    #[test]
    fn server_event_round_trips() {
        let events = vec![
            ServerEvent::OnlineStatus(vec![PresenceEntry {
                user_id: "u1".into(),
                is_online: true,
            }]),
            ServerEvent::Error(ErrorNotice { message: "nope".into(), kind: ErrorKind::Auth }),
            ServerEvent::OfflineMessages { messages: vec![], has_more: true },
            ServerEvent::HeartbeatAck,
        ];

        for event in events {
            let wire = event.to_wire().unwrap();
            assert_eq!(ServerEvent::from_wire(&wire).unwrap(), event);
        }
    }
}
