use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::application::ports::{ChatRequest, ChatTransport, TextChunkStream, TransportError};

/// Offline transport that replays a canned reply in the backend's wire
/// format, one raw chunk at a time.
pub struct ScaffoldChatTransport {
    delay: Duration,
}

impl ScaffoldChatTransport {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn wire_chunks(request: &ChatRequest) -> Vec<String> {
        let reply = format!(
            "This is a scaffold reply to \"{}\". Connect a backend for real answers.",
            request.prompt.trim()
        );
        let words: Vec<String> = reply
            .split_inclusive(' ')
            .map(|w| json!({ "type": "text", "chunk": w }).to_string())
            .collect();

        let mut lines = Vec::with_capacity(words.len() + 3);
        lines.push(json!({ "type": "status", "message": "Searching knowledge base..." }).to_string());
        lines.push(
            json!({
                "type": "metadata",
                "metadata": { "urls": ["https://example.org/scaffold"] }
            })
            .to_string(),
        );
        lines.extend(words);
        lines.push(json!({ "type": "complete" }).to_string());

        let mut chunks: Vec<String> = lines.into_iter().map(|l| format!("data: {}\n", l)).collect();

        // Split one line across two chunks the way a network read can.
        if let Some(first) = chunks.first_mut() {
            let mid = first.char_indices().nth(first.chars().count() / 2).map(|(i, _)| i);
            if let Some(mid) = mid {
                let tail = first.split_off(mid);
                chunks.insert(1, tail);
            }
        }
        chunks
    }
}

#[async_trait]
impl ChatTransport for ScaffoldChatTransport {
    #[tracing::instrument(skip(self, request, _access_token), fields(conversation_id = %request.conversation_id))]
    async fn open_stream(
        &self,
        request: &ChatRequest,
        _access_token: &str,
    ) -> Result<TextChunkStream, TransportError> {
        let chunks = Self::wire_chunks(request);
        let delay = self.delay;
        tracing::debug!(chunks = chunks.len(), "Replaying scaffold reply");

        let stream = async_stream::stream! {
            for chunk in chunks {
                tokio::time::sleep(delay).await;
                yield Ok(chunk);
            }
        };
        Ok(Box::pin(stream))
    }
}
