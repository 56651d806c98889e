//! Transport event types.
//!
//! Closed enums for every event name the gateway speaks. The serde
//! attributes pin the wire dialect (kebab-case event names, camelCase
//! payload fields) so the Rust names stay idiomatic.

use serde::{Deserialize, Serialize};

use crate::message::{MatchId, Message, MessageId, MessageKind, UserId};

/// Outbound chat message payload for `send-message`.
///
/// `content` is already sealed by the time it reaches this type; the
/// transport layer never sees plaintext for encrypted text messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Target conversation.
    pub match_id: MatchId,

    /// Sealed envelope (text) or asset reference (image).
    pub content: String,

    /// Content kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Presence entry in an `online-status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    /// User the entry describes.
    pub user_id: UserId,

    /// Whether the user currently holds a live connection.
    pub is_online: bool,
}

/// Classification of a gateway `error` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The auth token was rejected. Not retried automatically — the
    /// application must refresh credentials and reconnect.
    Auth,

    /// Any other server-side failure.
    #[default]
    Server,
}

/// Payload of a gateway `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    /// Human-readable description from the gateway.
    pub message: String,

    /// Error classification. Gateways that predate the field send plain
    /// errors, which default to [`ErrorKind::Server`].
    #[serde(default)]
    pub kind: ErrorKind,
}

/// Events the client sends to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Enter a conversation channel.
    #[serde(rename_all = "camelCase")]
    JoinMatch {
        /// Conversation to join.
        match_id: MatchId,
    },

    /// Leave a conversation channel.
    #[serde(rename_all = "camelCase")]
    LeaveMatch {
        /// Conversation to leave.
        match_id: MatchId,
    },

    /// Deliver a chat message. The only durable event kind: when the
    /// connection is down this is queued instead of dropped.
    SendMessage(OutboundMessage),

    /// Acknowledge messages as read.
    #[serde(rename_all = "camelCase")]
    MarkAsRead {
        /// Conversation containing the messages.
        match_id: MatchId,
        /// Messages being acknowledged.
        message_ids: Vec<MessageId>,
    },

    /// Begin a typing indicator.
    #[serde(rename_all = "camelCase")]
    TypingStart {
        /// Conversation being typed in.
        match_id: MatchId,
    },

    /// End a typing indicator.
    #[serde(rename_all = "camelCase")]
    TypingStop {
        /// Conversation no longer being typed in.
        match_id: MatchId,
    },

    /// Request presence for a set of users.
    #[serde(rename_all = "camelCase")]
    GetOnlineStatus {
        /// Users to query.
        user_ids: Vec<UserId>,
    },

    /// Liveness probe. Answered by [`ServerEvent::HeartbeatAck`].
    Heartbeat,
}

/// Events the gateway sends to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A chat message arrived in a joined conversation.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        /// Conversation the message belongs to.
        match_id: MatchId,
        /// The message record; `content` is still sealed here.
        message: Message,
    },

    /// The peer started or stopped typing.
    #[serde(rename_all = "camelCase")]
    UserTyping {
        /// User whose typing state changed.
        user_id: UserId,
        /// Whether they are currently typing.
        is_typing: bool,
    },

    /// The peer read some of our messages.
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        /// Conversation containing the messages.
        match_id: MatchId,
        /// Messages that were read.
        message_ids: Vec<MessageId>,
        /// User who read them.
        read_by: UserId,
    },

    /// A user joined a conversation channel.
    #[serde(rename_all = "camelCase")]
    UserJoined {
        /// User who joined.
        user_id: UserId,
    },

    /// A user left a conversation channel.
    #[serde(rename_all = "camelCase")]
    UserLeft {
        /// User who left.
        user_id: UserId,
    },

    /// A user's connection dropped.
    #[serde(rename_all = "camelCase")]
    UserOffline {
        /// User who went offline.
        user_id: UserId,
    },

    /// Presence response for a `get-online-status` request.
    OnlineStatus(Vec<PresenceEntry>),

    /// Gateway error, including auth rejections.
    Error(ErrorNotice),

    /// Server-side redelivery of messages that arrived while this client
    /// was disconnected. Replayed locally as individual `new-message`
    /// deliveries.
    #[serde(rename_all = "camelCase")]
    OfflineMessages {
        /// Redelivered messages, oldest first.
        messages: Vec<Message>,
        /// Whether another page is pending on the server.
        has_more: bool,
    },

    /// Liveness acknowledgment for a client heartbeat probe.
    HeartbeatAck,
}

/// Discriminant of a [`ServerEvent`], used as the dispatcher subscription
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `new-message`
    NewMessage,
    /// `user-typing`
    UserTyping,
    /// `messages-read`
    MessagesRead,
    /// `user-joined`
    UserJoined,
    /// `user-left`
    UserLeft,
    /// `user-offline`
    UserOffline,
    /// `online-status`
    OnlineStatus,
    /// `error`
    Error,
    /// `offline-messages`
    OfflineMessages,
    /// `heartbeat-ack`
    HeartbeatAck,
}

impl ServerEvent {
    /// Discriminant for dispatcher routing.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewMessage { .. } => EventKind::NewMessage,
            Self::UserTyping { .. } => EventKind::UserTyping,
            Self::MessagesRead { .. } => EventKind::MessagesRead,
            Self::UserJoined { .. } => EventKind::UserJoined,
            Self::UserLeft { .. } => EventKind::UserLeft,
            Self::UserOffline { .. } => EventKind::UserOffline,
            Self::OnlineStatus(_) => EventKind::OnlineStatus,
            Self::Error(_) => EventKind::Error,
            Self::OfflineMessages { .. } => EventKind::OfflineMessages,
            Self::HeartbeatAck => EventKind::HeartbeatAck,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: "msg-1".into(),
            match_id: "match-1".into(),
            sender_id: "user-a".into(),
            content: "mw1.abc.def".into(),
            kind: MessageKind::Text,
            is_encrypted: true,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn client_events_use_kebab_case_names() {
        let cases = [
            (ClientEvent::JoinMatch { match_id: "m".into() }, "join-match"),
            (ClientEvent::LeaveMatch { match_id: "m".into() }, "leave-match"),
            (
                ClientEvent::SendMessage(OutboundMessage {
                    match_id: "m".into(),
                    content: "c".into(),
                    kind: MessageKind::Text,
                }),
                "send-message",
            ),
            (
                ClientEvent::MarkAsRead { match_id: "m".into(), message_ids: vec!["1".into()] },
                "mark-as-read",
            ),
            (ClientEvent::TypingStart { match_id: "m".into() }, "typing-start"),
            (ClientEvent::TypingStop { match_id: "m".into() }, "typing-stop"),
            (ClientEvent::GetOnlineStatus { user_ids: vec!["u".into()] }, "get-online-status"),
            (ClientEvent::Heartbeat, "heartbeat"),
        ];

        for (event, name) in cases {
            let json = serde_json::to_string(&event).unwrap();
            assert!(json.contains(&format!("\"event\":\"{name}\"")), "{json}");
        }
    }

    #[test]
    fn server_event_decodes_gateway_json() {
        let json = r#"{
            "event": "new-message",
            "data": {
                "matchId": "match-1",
                "message": {
                    "id": "msg-1",
                    "matchId": "match-1",
                    "senderId": "user-a",
                    "content": "mw1.abc.def",
                    "type": "TEXT",
                    "isEncrypted": true,
                    "createdAt": 1700000000000
                }
            }
        }"#;

        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ServerEvent::NewMessage {
            match_id: "match-1".into(),
            message: sample_message(),
        });
    }

    #[test]
    fn error_without_kind_defaults_to_server() {
        let json = r#"{"event":"error","data":{"message":"boom"}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();

        assert_eq!(
            event,
            ServerEvent::Error(ErrorNotice { message: "boom".into(), kind: ErrorKind::Server })
        );
    }

    #[test]
    fn auth_error_round_trip() {
        let event = ServerEvent::Error(ErrorNotice {
            message: "token rejected".into(),
            kind: ErrorKind::Auth,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"auth\""));

        let decoded: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn heartbeat_pair_round_trip() {
        let probe = serde_json::to_string(&ClientEvent::Heartbeat).unwrap();
        assert_eq!(probe, r#"{"event":"heartbeat"}"#);

        let ack: ServerEvent = serde_json::from_str(r#"{"event":"heartbeat-ack"}"#).unwrap();
        assert_eq!(ack, ServerEvent::HeartbeatAck);
    }

    #[test]
    fn kind_covers_every_variant() {
        let events = vec![
            ServerEvent::NewMessage { match_id: "m".into(), message: sample_message() },
            ServerEvent::UserTyping { user_id: "u".into(), is_typing: true },
            ServerEvent::MessagesRead {
                match_id: "m".into(),
                message_ids: vec![],
                read_by: "u".into(),
            },
            ServerEvent::UserJoined { user_id: "u".into() },
            ServerEvent::UserLeft { user_id: "u".into() },
            ServerEvent::UserOffline { user_id: "u".into() },
            ServerEvent::OnlineStatus(vec![]),
            ServerEvent::Error(ErrorNotice { message: String::new(), kind: ErrorKind::Server }),
            ServerEvent::OfflineMessages { messages: vec![], has_more: false },
            ServerEvent::HeartbeatAck,
        ];

        let kinds: Vec<EventKind> = events.iter().map(ServerEvent::kind).collect();
        let mut deduped = kinds.clone();
        deduped.dedup();
        assert_eq!(kinds.len(), deduped.len(), "kinds must be distinct per variant");
    }
}
