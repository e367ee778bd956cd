use crate::domain::{ConversationId, ImageAttachment, Message, Metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    LoadingHistory,
    Sending,
    Error,
}

/// Observable state of one chat session, published after every change.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub conversation_id: ConversationId,
    pub conversation_title: Option<String>,
    pub messages: Vec<Message>,
    pub is_sending: bool,
    pub is_loading: bool,
    pub status: Option<String>,
    pub streaming_text: String,
    pub metadata: Metadata,
    pub error: Option<String>,
    pub pending_image: Option<ImageAttachment>,
}

impl ChatSnapshot {
    pub fn phase(&self) -> ChatPhase {
        if self.is_sending {
            ChatPhase::Sending
        } else if self.is_loading {
            ChatPhase::LoadingHistory
        } else if self.error.is_some() {
            ChatPhase::Error
        } else {
            ChatPhase::Idle
        }
    }

    pub fn can_send(&self, input: &str) -> bool {
        !self.is_sending
            && !self.is_loading
            && (!input.trim().is_empty() || self.pending_image.is_some())
    }

    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }
}

/// Asks the UI to scroll to the newest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub message_count: usize,
}
