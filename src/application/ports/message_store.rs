use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{
    Conversation, ConversationId, DeliveryStatus, Message, MessageId, MessageRole, Metadata,
    UserId,
};

use super::StoreError;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages of a conversation, ascending by server id.
    async fn select_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    async fn insert_message(&self, message: &NewMessage) -> Result<StoredMessage, StoreError>;

    async fn insert_conversation(
        &self,
        title: &str,
        user_id: &UserId,
    ) -> Result<Conversation, StoreError>;

    async fn select_latest_assistant_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<StoredMessage>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub sender: MessageRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A message row as read back from the store. `metadata` is raw and may use
/// legacy key shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: ConversationId,
    pub sender: MessageRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<Value>,
}

impl StoredMessage {
    pub fn normalized_metadata(&self) -> Metadata {
        self.metadata
            .as_ref()
            .map(Metadata::normalize)
            .unwrap_or_default()
    }

    pub fn into_message(self) -> Message {
        let metadata = self.normalized_metadata();
        Message {
            id: MessageId::from_server(self.id),
            conversation_id: self.conversation_id,
            sender: self.sender,
            body: self.body,
            created_at: self.created_at,
            status: DeliveryStatus::Sent,
            metadata,
        }
    }
}
