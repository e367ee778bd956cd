mod chat_transport;
mod message_store;
mod session_provider;
mod store_error;

pub use chat_transport::{ChatRequest, ChatTransport, HistoryTurn, TextChunkStream, TransportError};
pub use message_store::{MessageStore, NewMessage, StoredMessage};
pub use session_provider::{AuthError, AuthSession, SessionProvider};
pub use store_error::StoreError;
