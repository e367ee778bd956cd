use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use krishi_chat::application::ports::{
    AuthSession, ChatRequest, ChatTransport, MessageStore, NewMessage, StoreError, StoredMessage,
    TextChunkStream, TransportError,
};
use krishi_chat::application::services::{ChatSession, ChatSettings};
use krishi_chat::domain::{Conversation, ConversationId, MessageRole, UserId};
use krishi_chat::infrastructure::auth::StaticSessionProvider;
use krishi_chat::infrastructure::persistence::InMemoryMessageStore;

/// In-memory store with switchable failures and a record of inserts.
#[derive(Default)]
pub struct FakeStore {
    inner: InMemoryMessageStore,
    pub fail_conversation_insert: AtomicBool,
    pub fail_user_insert: AtomicBool,
    pub fail_assistant_insert: AtomicBool,
    pub fail_select: AtomicBool,
    pub latest_polls: AtomicUsize,
    /// Session reset right after a user message is saved.
    pub reset_after_user_insert: OnceLock<ChatSession>,
    inserted: Mutex<Vec<NewMessage>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inserted(&self) -> Vec<NewMessage> {
        self.inserted.lock().unwrap().clone()
    }

    pub async fn attach_metadata(&self, row_id: i64, metadata: Value) {
        self.inner.attach_metadata(row_id, metadata).await.unwrap();
    }

    /// Creates a conversation holding `turns` as alternating user/assistant
    /// rows, returning its id.
    pub async fn seed(&self, turns: &[&str]) -> ConversationId {
        let owner = UserId::new("farmer-1");
        let conversation = self.inner.insert_conversation("Seeded", &owner).await.unwrap();
        for (index, body) in turns.iter().enumerate() {
            let sender = if index % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            self.inner
                .insert_message(&NewMessage {
                    conversation_id: conversation.id,
                    user_id: owner.clone(),
                    sender,
                    body: body.to_string(),
                    created_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        conversation.id
    }
}

fn injected() -> StoreError {
    StoreError::QueryFailed("injected failure".to_string())
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn select_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.select_messages(conversation_id).await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<StoredMessage, StoreError> {
        let fail = match message.sender {
            MessageRole::User => &self.fail_user_insert,
            MessageRole::Assistant => &self.fail_assistant_insert,
        };
        if fail.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inserted.lock().unwrap().push(message.clone());
        let stored = self.inner.insert_message(message).await;
        if message.sender == MessageRole::User {
            if let Some(session) = self.reset_after_user_insert.get() {
                session.reset_for_new_conversation();
            }
        }
        stored
    }

    async fn insert_conversation(
        &self,
        title: &str,
        user_id: &UserId,
    ) -> Result<Conversation, StoreError> {
        if self.fail_conversation_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.insert_conversation(title, user_id).await
    }

    async fn select_latest_assistant_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<StoredMessage>, StoreError> {
        self.latest_polls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .select_latest_assistant_message(conversation_id)
            .await
    }
}

enum Script {
    Chunks(Vec<String>),
    OpenError(fn() -> TransportError),
    ChunksThenError(Vec<String>, fn() -> TransportError),
    Hang(Vec<String>),
}

/// Transport that replays a fixed script for every request and records
/// what it was asked.
pub struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    fn with(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn chunks(chunks: &[&str]) -> Arc<Self> {
        Self::with(Script::Chunks(owned(chunks)))
    }

    pub fn lines(lines: &[Value]) -> Arc<Self> {
        Self::with(Script::Chunks(vec![ndjson(lines)]))
    }

    pub fn failing(error: fn() -> TransportError) -> Arc<Self> {
        Self::with(Script::OpenError(error))
    }

    pub fn chunks_then_error(chunks: &[&str], error: fn() -> TransportError) -> Arc<Self> {
        Self::with(Script::ChunksThenError(owned(chunks), error))
    }

    /// Delivers `chunks`, then keeps the body open forever.
    pub fn hang_after(chunks: &[&str]) -> Arc<Self> {
        Self::with(Script::Hang(owned(chunks)))
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn owned(chunks: &[&str]) -> Vec<String> {
    chunks.iter().map(|c| c.to_string()).collect()
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(
        &self,
        request: &ChatRequest,
        _access_token: &str,
    ) -> Result<TextChunkStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match &self.script {
            Script::Chunks(chunks) => Ok(stream::iter(chunks.clone().into_iter().map(Ok)).boxed()),
            Script::OpenError(error) => Err(error()),
            Script::ChunksThenError(chunks, error) => {
                let error = *error;
                Ok(stream::iter(chunks.clone().into_iter().map(Ok))
                    .chain(stream::once(async move { Err(error()) }))
                    .boxed())
            }
            Script::Hang(chunks) => Ok(stream::iter(chunks.clone().into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

/// Newline-delimited JSON body made of `lines`.
pub fn ndjson(lines: &[Value]) -> String {
    lines
        .iter()
        .map(|line| format!("{}\n", line))
        .collect::<String>()
}

pub fn signed_in() -> Arc<StaticSessionProvider> {
    Arc::new(StaticSessionProvider::new(Some(AuthSession::new(
        "token-123",
        UserId::new("farmer-1"),
    ))))
}

pub fn chat_session(
    store: Arc<FakeStore>,
    transport: Arc<ScriptedTransport>,
    settings: ChatSettings,
) -> ChatSession {
    ChatSession::new(store, transport, signed_in(), settings)
}
