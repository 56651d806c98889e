//! Chat message records.
//!
//! [`Message`] mirrors the shape the persistence API returns; the transport
//! delivers the same record inside `new-message` events.

use serde::{Deserialize, Serialize};

/// Conversation channel between two matched users.
///
/// The REST backend issues these as UUID strings.
pub type MatchId = String;

/// Stable user identifier issued by the backend.
pub type UserId = String;

/// Message identifier issued by the persistence API.
pub type MessageId = String;

/// Kind of chat message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// Plain text. Encrypted end-to-end when `is_encrypted` is set.
    Text,
    /// Reference to an uploaded image asset. Never encrypted.
    Image,
}

/// One chat line as exchanged with the persistence API and the transport.
///
/// `content` holds the sealed envelope while `is_encrypted` is true and the
/// kind is [`MessageKind::Text`]; the session layer replaces it with the
/// plaintext (or a placeholder on decrypt failure) before anything
/// user-facing sees the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,

    /// Conversation this message belongs to.
    pub match_id: MatchId,

    /// Author of the message.
    pub sender_id: UserId,

    /// Message body: sealed envelope, plaintext, or asset reference.
    pub content: String,

    /// Content kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Whether `content` is a sealed envelope.
    pub is_encrypted: bool,

    /// Creation timestamp in Unix milliseconds (UTC).
    pub created_at: u64,
}

impl Message {
    /// Whether the session layer should attempt decryption.
    ///
    /// Only encrypted text bodies are sealed; image references travel in
    /// the clear regardless of the flag.
    pub fn needs_decryption(&self) -> bool {
        self.is_encrypted && self.kind == MessageKind::Text
    }
}
