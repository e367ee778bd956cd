use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::application::ports::{
    MessageStore, NewMessage, SessionProvider, StoreError, StoredMessage,
};
use crate::domain::{Conversation, ConversationId, MessageRole, UserId};

const MESSAGES_TABLE: &str = "messages";
const CONVERSATIONS_TABLE: &str = "conversations";

#[derive(Deserialize)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender: String,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl TryFrom<MessageRow> for StoredMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let sender = row
            .sender
            .parse::<MessageRole>()
            .map_err(StoreError::QueryFailed)?;

        Ok(StoredMessage {
            id: row.id,
            conversation_id: ConversationId::new(row.conversation_id),
            sender,
            body: row.content,
            created_at: row.created_at,
            metadata: row.metadata.filter(|m| !m.is_null()),
        })
    }
}

#[derive(Serialize)]
struct MessageInsert<'a> {
    conversation_id: i64,
    user_id: &'a str,
    sender: &'a str,
    content: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ConversationInsert<'a> {
    title: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct ConversationRow {
    id: i64,
    title: String,
    user_id: String,
}

/// Message store backed by a Supabase (PostgREST) project. Requests carry
/// the project key and the signed-in user's token so row-level security
/// applies.
pub struct SupabaseMessageStore {
    client: Client,
    base_url: String,
    api_key: String,
    sessions: Arc<dyn SessionProvider>,
}

impl SupabaseMessageStore {
    pub fn new(base_url: &str, api_key: &str, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sessions,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self
            .sessions
            .current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.api_key.clone());

        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Store request rejected");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::Rejected(format!("HTTP {}: {}", status, body)))
            }
            _ => Err(StoreError::QueryFailed(format!("HTTP {}: {}", status, body))),
        }
    }

    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        Self::send(request)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("decode: {}", e)))
    }
}

#[async_trait]
impl MessageStore for SupabaseMessageStore {
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn select_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let request = self.request(Method::GET, MESSAGES_TABLE).query(&[
            ("select", "*".to_string()),
            ("conversation_id", format!("eq.{}", conversation_id)),
            ("order", "id.asc".to_string()),
        ]);

        Self::rows::<MessageRow>(request)
            .await?
            .into_iter()
            .map(StoredMessage::try_from)
            .collect()
    }

    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id, sender = %message.sender))]
    async fn insert_message(&self, message: &NewMessage) -> Result<StoredMessage, StoreError> {
        let insert = MessageInsert {
            conversation_id: message.conversation_id.as_i64(),
            user_id: message.user_id.as_str(),
            sender: message.sender.as_str(),
            content: &message.body,
            created_at: message.created_at,
        };
        let request = self
            .request(Method::POST, MESSAGES_TABLE)
            .header("Prefer", "return=representation")
            .json(&insert);

        let row = Self::rows::<MessageRow>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("inserted message row".to_string()))?;

        StoredMessage::try_from(row)
    }

    #[instrument(skip(self, title), fields(user_id = %user_id))]
    async fn insert_conversation(
        &self,
        title: &str,
        user_id: &UserId,
    ) -> Result<Conversation, StoreError> {
        let insert = ConversationInsert {
            title,
            user_id: user_id.as_str(),
        };
        let request = self
            .request(Method::POST, CONVERSATIONS_TABLE)
            .header("Prefer", "return=representation")
            .json(&insert);

        let row = Self::rows::<ConversationRow>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("inserted conversation row".to_string()))?;

        Ok(Conversation::new(
            ConversationId::new(row.id),
            row.title,
            UserId::new(row.user_id),
        ))
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn select_latest_assistant_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let request = self.request(Method::GET, MESSAGES_TABLE).query(&[
            ("select", "*".to_string()),
            ("conversation_id", format!("eq.{}", conversation_id)),
            ("sender", format!("eq.{}", MessageRole::Assistant.as_str())),
            ("order", "id.desc".to_string()),
            ("limit", "1".to_string()),
        ]);

        Self::rows::<MessageRow>(request)
            .await?
            .into_iter()
            .next()
            .map(StoredMessage::try_from)
            .transpose()
    }
}
