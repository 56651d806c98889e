//! Collaborator REST surface.
//!
//! The chat backend's HTTP API is consumed, not implemented, here: the
//! session only needs message history pages and image uploads. Production
//! wires this to the HTTP client; tests provide stubs.

use async_trait::async_trait;
use matchwire_proto::Message;
use thiserror::Error;

/// Errors from collaborator REST calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request could not be delivered (network, timeout).
    #[error("api request failed: {0}")]
    Request(String),

    /// The backend answered with something unusable.
    #[error("unexpected api response: {0}")]
    Response(String),
}

/// Narrow interface over the chat backend's REST endpoints.
///
/// All calls carry the bearer token the implementation was built with.
#[async_trait]
pub trait CollaboratorApi: Send + Sync + 'static {
    /// Fetch one page of message history for a conversation.
    ///
    /// Returned messages may still be sealed; the session decrypts them.
    async fn fetch_messages(
        &self,
        match_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError>;

    /// Upload a chat image and return the reference to send in its place.
    async fn upload_chat_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ApiError>;
}
