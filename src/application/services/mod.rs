mod chat_error;
mod chat_session;
mod chat_settings;
mod chat_snapshot;
mod chunk_parser;
mod metadata_reconciler;
mod stream_event;

pub use chat_error::ChatError;
pub use chat_session::{
    ChatSession, FALLBACK_REPLY, STATUS_GENERATING, STATUS_PROCESSING_IMAGE,
    STATUS_PROCESSING_QUERY, SendOutcome, SendRejection, history_window,
};
pub use chat_settings::{BackendErrorPolicy, ChatSettings, ReconcilePolicy};
pub use chat_snapshot::{ChatPhase, ChatSnapshot, ScrollRequest};
pub use chunk_parser::{ChunkParser, LineError, decode_line};
pub use metadata_reconciler::MetadataReconciler;
pub use stream_event::StreamEvent;
