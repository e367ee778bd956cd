use chrono::{DateTime, Utc};

use super::{ConversationId, DeliveryStatus, MessageId, MessageRole, Metadata};

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: MessageRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub metadata: Metadata,
}

impl Message {
    /// A message created on the client ahead of its store row.
    pub fn pending(conversation_id: ConversationId, sender: MessageRole, body: String) -> Self {
        Self {
            id: MessageId::pending(),
            conversation_id,
            sender,
            body,
            created_at: Utc::now(),
            status: DeliveryStatus::Sent,
            metadata: Metadata::empty(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_user(&self) -> bool {
        self.sender == MessageRole::User
    }
}
