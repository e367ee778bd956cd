use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::application::ports::{MessageStore, NewMessage, StoreError, StoredMessage};
use crate::domain::{Conversation, ConversationId, MessageRole, UserId};

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender: String,
    content: String,
    created_at: DateTime<Utc>,
    metadata: Option<Json<Value>>,
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
            metadata: row.metadata.map(|m| m.0),
        })
    }
}

#[derive(FromRow)]
struct ConversationRow {
    id: i64,
    title: String,
    user_id: String,
}

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))
    }

    /// Writes enrichment onto an existing row, as the backend does after
    /// a reply has been stored.
    #[instrument(skip(self, metadata))]
    pub async fn update_metadata(&self, message_id: i64, metadata: &Value) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE messages SET metadata = $1 WHERE id = $2")
            .bind(Json(metadata))
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {}", message_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn select_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender, content, created_at, metadata
            FROM messages
            WHERE conversation_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.into_iter().map(StoredMessage::try_from).collect()
    }

    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id, sender = %message.sender))]
    async fn insert_message(&self, message: &NewMessage) -> Result<StoredMessage, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (conversation_id, user_id, sender, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, sender, content, created_at, metadata
            "#,
        )
        .bind(message.conversation_id.as_i64())
        .bind(message.user_id.as_str())
        .bind(message.sender.as_str())
        .bind(&message.body)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        StoredMessage::try_from(row)
    }

    #[instrument(skip(self, title), fields(user_id = %user_id))]
    async fn insert_conversation(
        &self,
        title: &str,
        user_id: &UserId,
    ) -> Result<Conversation, StoreError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (title, user_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, title, user_id
            "#,
        )
        .bind(title)
        .bind(user_id.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

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
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender, content, created_at, metadata
            FROM messages
            WHERE conversation_id = $1 AND sender = 'assistant'
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.map(StoredMessage::try_from).transpose()
    }
}
