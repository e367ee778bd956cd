use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::domain::{ConversationId, ImageAttachment, MessageRole};

/// Response body of a chat request, delivered as decoded text chunks in
/// arrival order.
pub type TextChunkStream = BoxStream<'static, Result<String, TransportError>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(
        &self,
        request: &ChatRequest,
        access_token: &str,
    ) -> Result<TextChunkStream, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub conversation_id: ConversationId,
    pub prompt: String,
    pub history: Vec<HistoryTurn>,
    pub image: Option<ImageAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Your session has expired. Please sign in again.")]
    AuthExpired,
    #[error("The server ran into a problem. Please try again later.")]
    Server,
    #[error("Network error (status {0}). Please try again.")]
    Status(u16),
    #[error("The request timed out after {}s. Please try again.", .0.as_secs())]
    Timeout(Duration),
    #[error("Could not reach the server: {0}")]
    Connection(String),
    #[error("Connection lost while receiving the response: {0}")]
    Body(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
