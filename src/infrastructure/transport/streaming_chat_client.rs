use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, multipart};

use crate::application::ports::{ChatRequest, ChatTransport, TextChunkStream, TransportError};
use crate::infrastructure::observability::{REQUEST_ID_HEADER, RequestId, sanitize_prompt};

use super::Utf8ChunkDecoder;

pub struct StreamingChatClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl StreamingChatClient {
    pub fn new(base_url: &str, chat_path: &str, timeout: Duration) -> Self {
        let endpoint = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            chat_path.trim_start_matches('/')
        );
        Self {
            client: Client::new(),
            endpoint,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: &ChatRequest) -> Result<multipart::Form, TransportError> {
        let history = serde_json::to_string(&request.history)
            .map_err(|e| TransportError::InvalidRequest(format!("history: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("conversation_id", request.conversation_id.to_string())
            .text("prompt", request.prompt.clone())
            .text("history", history);

        if let Some(image) = &request.image {
            let part = multipart::Part::bytes(image.data.to_vec())
                .file_name(image.filename.clone())
                .mime_str(&image.content_type)
                .map_err(|e| TransportError::InvalidRequest(format!("mime: {}", e)))?;
            form = form.part("image", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl ChatTransport for StreamingChatClient {
    #[tracing::instrument(
        skip(self, request, access_token),
        fields(conversation_id = %request.conversation_id, request_id)
    )]
    async fn open_stream(
        &self,
        request: &ChatRequest,
        access_token: &str,
    ) -> Result<TextChunkStream, TransportError> {
        if access_token.trim().is_empty() {
            return Err(TransportError::InvalidRequest(
                "missing access token".to_string(),
            ));
        }

        let request_id = RequestId::generate();
        tracing::Span::current().record("request_id", request_id.as_str());
        tracing::debug!(
            prompt = %sanitize_prompt(&request.prompt),
            history = request.history.len(),
            image = request.image.as_ref().map(|i| i.size_bytes()),
            "Sending chat request"
        );

        let form = Self::build_form(request)?;
        let pending = self
            .client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .header(ACCEPT, "text/event-stream")
            .multipart(form)
            .send();

        let response = tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(TransportError::AuthExpired),
            StatusCode::INTERNAL_SERVER_ERROR => return Err(TransportError::Server),
            other => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = %other, body = %body, "Chat request rejected");
                return Err(TransportError::Status(other.as_u16()));
            }
        }

        tracing::debug!("Chat stream opened");
        let mut body = response.bytes_stream();
        let chunks = async_stream::stream! {
            let mut decoder = Utf8ChunkDecoder::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(TransportError::Body(e.to_string()));
                        return;
                    }
                }
            }
            let rest = decoder.finish();
            if !rest.is_empty() {
                yield Ok(rest);
            }
        };

        Ok(Box::pin(chunks))
    }
}
