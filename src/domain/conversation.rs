use super::{ConversationId, UserId};

const IMAGE_ONLY_TITLE: &str = "Image message";

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub owner: UserId,
}

impl Conversation {
    pub fn new(id: ConversationId, title: String, owner: UserId) -> Self {
        Self { id, title, owner }
    }

    /// Title taken from the first message: its first `max_chars` characters,
    /// or a fixed label when the message carries only an image.
    pub fn derive_title(first_message: &str, max_chars: usize) -> String {
        let trimmed = first_message.trim();
        if trimmed.is_empty() {
            return IMAGE_ONLY_TITLE.to_string();
        }
        trimmed.chars().take(max_chars).collect()
    }
}
