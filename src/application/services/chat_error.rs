use crate::application::ports::{AuthError, StoreError, TransportError};

/// Failure of a chat operation. `Display` is the text shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Could not start a new conversation. Please try again.")]
    ConversationCreation(#[source] StoreError),
    #[error("Your message could not be saved. Please try again.")]
    MessagePersistence(#[source] StoreError),
    #[error("Could not load this conversation. Please try again.")]
    HistoryUnavailable(#[source] StoreError),
    #[error("{0}")]
    Backend(String),
}

impl ChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Auth(_) => "authentication",
            ChatError::Transport(_) => "network",
            ChatError::ConversationCreation(_)
            | ChatError::MessagePersistence(_)
            | ChatError::HistoryUnavailable(_) => "persistence",
            ChatError::Backend(_) => "backend",
        }
    }
}
