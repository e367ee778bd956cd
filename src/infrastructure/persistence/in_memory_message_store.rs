use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::application::ports::{MessageStore, NewMessage, StoreError, StoredMessage};
use crate::domain::{Conversation, ConversationId, MessageRole, UserId};

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: Vec<StoredMessage>,
    next_conversation_id: i64,
    next_message_id: i64,
}

/// Process-local store for scaffold runs. When `enrichment` is set, it is
/// written onto the latest assistant row the first time that row is read
/// back, standing in for the backend job that attaches metadata after the
/// reply is stored.
#[derive(Default)]
pub struct InMemoryMessageStore {
    tables: RwLock<Tables>,
    enrichment: Option<Value>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enrichment(mut self, metadata: Value) -> Self {
        self.enrichment = Some(metadata);
        self
    }

    pub async fn attach_metadata(&self, message_id: i64, metadata: Value) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {}", message_id)))?;
        row.metadata = Some(metadata);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn select_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<StoredMessage, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables
            .conversations
            .iter()
            .any(|c| c.id == message.conversation_id)
        {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                message.conversation_id
            )));
        }

        tables.next_message_id += 1;
        let stored = StoredMessage {
            id: tables.next_message_id,
            conversation_id: message.conversation_id,
            sender: message.sender,
            body: message.body.clone(),
            created_at: message.created_at,
            metadata: None,
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn insert_conversation(
        &self,
        title: &str,
        user_id: &UserId,
    ) -> Result<Conversation, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_conversation_id += 1;
        let conversation = Conversation::new(
            ConversationId::new(tables.next_conversation_id),
            title.to_string(),
            user_id.clone(),
        );
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn select_latest_assistant_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let mut tables = self.tables.write().await;
        let enrichment = self.enrichment.as_ref();
        let latest = tables
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.conversation_id == conversation_id && m.sender == MessageRole::Assistant);

        Ok(latest.map(|row| {
            if row.metadata.is_none() {
                row.metadata = enrichment.cloned();
            }
            row.clone()
        }))
    }
}
