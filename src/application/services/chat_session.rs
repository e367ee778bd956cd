use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tracing::Instrument;

use crate::application::ports::{
    AuthError, AuthSession, ChatRequest, ChatTransport, HistoryTurn, MessageStore, NewMessage,
    SessionProvider, StoredMessage,
};
use crate::domain::{
    Conversation, ConversationId, DeliveryStatus, ImageAttachment, Message, MessageId,
    MessageRole, Metadata,
};

use super::{
    BackendErrorPolicy, ChatError, ChatSettings, ChatSnapshot, ChunkParser, MetadataReconciler,
    ScrollRequest, StreamEvent,
};

pub const STATUS_PROCESSING_QUERY: &str = "Processing query...";
pub const STATUS_PROCESSING_IMAGE: &str = "Processing image...";
pub const STATUS_GENERATING: &str = "Generating response...";
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't generate a response right now. Please try again.";

const DEFAULT_BACKEND_ERROR: &str = "The assistant could not answer this question.";
const INTERNAL_ERROR: &str = "Something went wrong. Please try again.";
const SCROLL_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
pub enum SendOutcome {
    Completed,
    Rejected(SendRejection),
    Failed(ChatError),
    /// The session was reset or switched while the turn was running.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    Busy,
    EmptyMessage,
    NothingToRetry,
}

struct SessionState {
    view: ChatSnapshot,
    /// Bumped on reset and conversation switch; work started under an older
    /// generation must not touch the view.
    generation: u64,
    last_prompt: Option<String>,
    active_turn: Option<AbortHandle>,
}

struct Turn {
    generation: u64,
    conversation_id: ConversationId,
    session: AuthSession,
}

struct Inner {
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<dyn SessionProvider>,
    settings: ChatSettings,
    reconciler: MetadataReconciler,
    state: Mutex<SessionState>,
    updates: watch::Sender<ChatSnapshot>,
    scrolls: broadcast::Sender<ScrollRequest>,
}

/// Client-side state machine for one server-backed conversation.
///
/// Operations run on the caller's task except the streaming part of a turn,
/// which runs on its own task so that [`ChatSession::reset_for_new_conversation`]
/// can abort it. Observers read state through [`ChatSession::subscribe`].
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<dyn SessionProvider>,
        settings: ChatSettings,
    ) -> Self {
        let (updates, _) = watch::channel(ChatSnapshot::default());
        let (scrolls, _) = broadcast::channel(SCROLL_CHANNEL_CAPACITY);
        let reconciler = MetadataReconciler::new(Arc::clone(&store), settings.reconcile);

        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                sessions,
                settings,
                reconciler,
                state: Mutex::new(SessionState {
                    view: ChatSnapshot::default(),
                    generation: 0,
                    last_prompt: None,
                    active_turn: None,
                }),
                updates,
                scrolls,
            }),
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.lock().view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn scroll_requests(&self) -> broadcast::Receiver<ScrollRequest> {
        self.inner.scrolls.subscribe()
    }

    pub fn can_send(&self, input: &str) -> bool {
        self.inner.lock().view.can_send(input)
    }

    pub async fn send(&self, text: &str, image: Option<ImageAttachment>) -> SendOutcome {
        self.inner.send(text, image).await
    }

    pub async fn retry_last_user_message(&self) -> SendOutcome {
        self.inner.retry_last_user_message().await
    }

    pub async fn load_history(&self, conversation_id: ConversationId) -> Result<(), ChatError> {
        self.inner.load_history(conversation_id).await
    }

    pub fn clear_error(&self) {
        let mut state = self.inner.lock();
        state.view.error = None;
        self.inner.publish(&state);
    }

    pub fn set_pending_image(&self, image: Option<ImageAttachment>) {
        let mut state = self.inner.lock();
        state.view.pending_image = image;
        self.inner.publish(&state);
    }

    pub fn reset_for_new_conversation(&self) {
        let mut state = self.inner.lock();
        Inner::start_new_generation(&mut state);
        tracing::debug!(generation = state.generation, "Chat session reset");
        self.inner.publish(&state);
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.view.clone());
    }

    fn request_scroll(&self, message_count: usize) {
        // No receivers just means nothing is rendered yet.
        let _ = self.scrolls.send(ScrollRequest { message_count });
    }

    /// Applies `change` and notifies observers, unless the session has moved
    /// past `generation`.
    fn update<R>(&self, generation: u64, change: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(
                stale = generation,
                current = state.generation,
                "Dropping update from a previous session"
            );
            return None;
        }
        let result = change(&mut state);
        self.publish(&state);
        Some(result)
    }

    fn start_new_generation(state: &mut SessionState) {
        if let Some(turn) = state.active_turn.take() {
            turn.abort();
        }
        state.generation += 1;
        state.last_prompt = None;
        let pending_image = state.view.pending_image.take();
        state.view = ChatSnapshot {
            pending_image,
            ..ChatSnapshot::default()
        };
    }

    fn current_session(&self) -> Result<AuthSession, AuthError> {
        self.sessions
            .current_session()
            .ok_or(AuthError::NoSession)?
            .validate(Utc::now())
    }

    fn admit(
        &self,
        prompt: &str,
        image: Option<ImageAttachment>,
    ) -> Result<(u64, Option<ImageAttachment>), SendRejection> {
        let mut state = self.lock();
        if state.view.is_sending || state.view.is_loading {
            return Err(SendRejection::Busy);
        }
        let image = image.or_else(|| state.view.pending_image.clone());
        if prompt.is_empty() && image.is_none() {
            return Err(SendRejection::EmptyMessage);
        }

        let status = if image.is_some() {
            STATUS_PROCESSING_IMAGE
        } else {
            STATUS_PROCESSING_QUERY
        };
        state.view.is_sending = true;
        state.view.error = None;
        state.view.status = Some(status.to_string());
        state.view.streaming_text.clear();
        state.view.metadata = Metadata::empty();
        state.last_prompt = Some(prompt.to_string());
        self.publish(&state);

        Ok((state.generation, image))
    }

    async fn send(self: &Arc<Self>, text: &str, image: Option<ImageAttachment>) -> SendOutcome {
        let prompt = text.trim().to_string();
        let (generation, image) = match self.admit(&prompt, image) {
            Ok(admitted) => admitted,
            Err(rejection) => {
                tracing::debug!(?rejection, "Send rejected");
                return SendOutcome::Rejected(rejection);
            }
        };

        let session = match self.current_session() {
            Ok(session) => session,
            Err(e) => return self.fail(generation, e.into()),
        };

        let conversation_id = match self.ensure_conversation(generation, &prompt, &session).await {
            Ok(Some(id)) => id,
            Ok(None) => return SendOutcome::Cancelled,
            Err(e) => return self.fail(generation, e),
        };

        let user_message = Message::pending(conversation_id, MessageRole::User, prompt.clone());
        let history_turns = self.settings.history_turns;
        let appended = self.update(generation, |state| {
            let history = history_window(&state.view.messages, history_turns);
            state.view.messages.push(user_message.clone());
            (history, state.view.messages.len())
        });
        let Some((history, message_count)) = appended else {
            return SendOutcome::Cancelled;
        };
        self.request_scroll(message_count);

        let record = NewMessage {
            conversation_id,
            user_id: session.user_id.clone(),
            sender: MessageRole::User,
            body: prompt.clone(),
            created_at: user_message.created_at,
        };
        if let Err(e) = self.store.insert_message(&record).await {
            tracing::warn!(error = %e, "Saving user message failed, removing it");
            self.update(generation, |state| {
                state.view.messages.retain(|m| m.id != user_message.id)
            });
            return self.fail(generation, ChatError::MessagePersistence(e));
        }

        let request = ChatRequest {
            conversation_id,
            prompt,
            history,
            image,
        };
        let turn = Turn {
            generation,
            conversation_id,
            session,
        };
        let task = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!("Session reset while saving the prompt, turn not started");
                return SendOutcome::Cancelled;
            }
            let task = tokio::spawn(Arc::clone(self).run_turn(turn, request));
            state.active_turn = Some(task.abort_handle());
            task
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => SendOutcome::Cancelled,
            Err(e) => {
                tracing::error!(error = %e, "Chat turn task failed");
                self.fail(generation, ChatError::Backend(INTERNAL_ERROR.to_string()))
            }
        }
    }

    async fn ensure_conversation(
        &self,
        generation: u64,
        prompt: &str,
        session: &AuthSession,
    ) -> Result<Option<ConversationId>, ChatError> {
        let current = self.lock().view.conversation_id;
        if !current.is_transient() {
            return Ok(Some(current));
        }

        let title = Conversation::derive_title(prompt, self.settings.title_max_chars);
        let conversation = self
            .store
            .insert_conversation(&title, &session.user_id)
            .await
            .map_err(ChatError::ConversationCreation)?;
        tracing::info!(conversation_id = %conversation.id, "Conversation created");

        Ok(self.update(generation, |state| {
            state.view.conversation_id = conversation.id;
            state.view.conversation_title = Some(conversation.title);
            conversation.id
        }))
    }

    async fn run_turn(self: Arc<Self>, turn: Turn, request: ChatRequest) -> SendOutcome {
        let span = tracing::info_span!(
            "chat_turn",
            conversation_id = %turn.conversation_id,
            generation = turn.generation,
            history = request.history.len(),
            has_image = request.image.is_some(),
        );

        async move {
            let mut stream = match self
                .transport
                .open_stream(&request, &turn.session.access_token)
                .await
            {
                Ok(stream) => stream,
                Err(e) => return self.fail(turn.generation, e.into()),
            };

            if self
                .update(turn.generation, |state| state.view.pending_image = None)
                .is_none()
            {
                return SendOutcome::Cancelled;
            }

            let mut parser = ChunkParser::new();
            while let Some(chunk) = stream.next().await {
                let text = match chunk {
                    Ok(text) => text,
                    Err(e) => return self.fail(turn.generation, e.into()),
                };
                for event in parser.feed(&text) {
                    if let ControlFlow::Break(outcome) =
                        self.apply_event(&turn, event, parser.skipped()).await
                    {
                        return outcome;
                    }
                }
            }
            for event in parser.finish() {
                if let ControlFlow::Break(outcome) =
                    self.apply_event(&turn, event, parser.skipped()).await
                {
                    return outcome;
                }
            }

            tracing::debug!("Stream closed without a completion event");
            self.finalize_turn(&turn, parser.skipped()).await
        }
        .instrument(span)
        .await
    }

    async fn apply_event(
        self: &Arc<Self>,
        turn: &Turn,
        event: StreamEvent,
        skipped: usize,
    ) -> ControlFlow<SendOutcome> {
        let generation = turn.generation;
        tracing::trace!(kind = event.kind(), "Applying stream event");
        let applied = match event {
            StreamEvent::Status(message) => {
                self.update(generation, |state| state.view.status = Some(message))
            }
            StreamEvent::Metadata(metadata) => {
                self.update(generation, |state| state.view.metadata = metadata)
            }
            StreamEvent::Text(chunk) => self.update(generation, |state| {
                state.view.streaming_text.push_str(&chunk);
                state.view.status = Some(STATUS_GENERATING.to_string());
            }),
            StreamEvent::Complete => {
                return ControlFlow::Break(self.finalize_turn(turn, skipped).await);
            }
            StreamEvent::Error(message) => match self.settings.backend_errors {
                BackendErrorPolicy::Ignore => {
                    tracing::warn!(message = ?message, "Backend reported an error, ignoring");
                    Some(())
                }
                BackendErrorPolicy::Surface => {
                    let text = message.unwrap_or_else(|| DEFAULT_BACKEND_ERROR.to_string());
                    return ControlFlow::Break(self.fail(generation, ChatError::Backend(text)));
                }
            },
        };

        match applied {
            Some(()) => ControlFlow::Continue(()),
            None => ControlFlow::Break(SendOutcome::Cancelled),
        }
    }

    async fn finalize_turn(self: &Arc<Self>, turn: &Turn, skipped: usize) -> SendOutcome {
        let finalized = self.update(turn.generation, |state| {
            if !state.view.is_sending {
                return None;
            }
            let text = std::mem::take(&mut state.view.streaming_text);
            let body = if text.trim().is_empty() {
                FALLBACK_REPLY.to_string()
            } else {
                text
            };
            let metadata = std::mem::take(&mut state.view.metadata);
            let message = Message::pending(turn.conversation_id, MessageRole::Assistant, body)
                .with_metadata(metadata);

            state.view.messages.push(message.clone());
            state.view.is_sending = false;
            state.view.status = None;
            state.active_turn = None;
            Some((message, state.view.messages.len()))
        });
        let Some(Some((message, message_count))) = finalized else {
            return SendOutcome::Cancelled;
        };
        self.request_scroll(message_count);
        tracing::info!(
            chars = message.body.chars().count(),
            skipped_fragments = skipped,
            "Assistant turn finalized"
        );

        let record = NewMessage {
            conversation_id: turn.conversation_id,
            user_id: turn.session.user_id.clone(),
            sender: MessageRole::Assistant,
            body: message.body.clone(),
            created_at: message.created_at,
        };
        match self.store.insert_message(&record).await {
            Ok(stored) => self.spawn_reconciliation(turn, message.id, Some(stored.id)),
            Err(e) => {
                tracing::warn!(error = %e, "Saving assistant message failed");
                self.update(turn.generation, |state| {
                    if let Some(m) = state.view.messages.iter_mut().find(|m| m.id == message.id) {
                        m.status = DeliveryStatus::Failed;
                    }
                });
            }
        }

        SendOutcome::Completed
    }

    fn spawn_reconciliation(self: &Arc<Self>, turn: &Turn, message_id: MessageId, row: Option<i64>) {
        let inner = Arc::clone(self);
        let generation = turn.generation;
        let conversation_id = turn.conversation_id;

        tokio::spawn(async move {
            if let Some(metadata) = inner.reconciler.poll(conversation_id, row).await {
                inner.merge_metadata(generation, &message_id, metadata);
            }
        });
    }

    fn merge_metadata(&self, generation: u64, message_id: &MessageId, metadata: Metadata) -> bool {
        let merged = self
            .update(generation, |state| {
                match state.view.messages.iter_mut().find(|m| &m.id == message_id) {
                    Some(message) => {
                        message.metadata = metadata;
                        true
                    }
                    None => false,
                }
            })
            .unwrap_or(false);

        if merged {
            tracing::debug!(message_id = %message_id, "Metadata merged into message");
        } else {
            tracing::debug!(message_id = %message_id, "Message gone, metadata discarded");
        }
        merged
    }

    fn fail(&self, generation: u64, error: ChatError) -> SendOutcome {
        tracing::warn!(kind = error.kind(), error = ?error, "Chat turn failed");
        let message = error.to_string();
        let applied = self.update(generation, |state| {
            state.view.error = Some(message);
            state.view.is_sending = false;
            state.view.status = None;
            state.view.streaming_text.clear();
            state.view.metadata = Metadata::empty();
            state.active_turn = None;
        });

        match applied {
            Some(()) => SendOutcome::Failed(error),
            None => SendOutcome::Cancelled,
        }
    }

    async fn retry_last_user_message(self: &Arc<Self>) -> SendOutcome {
        let prompt = {
            let mut state = self.lock();
            state.view.error = None;
            self.publish(&state);
            state
                .last_prompt
                .clone()
                .or_else(|| state.view.last_user_message().map(|m| m.body.clone()))
        };

        match prompt {
            Some(prompt) => self.send(&prompt, None).await,
            None => SendOutcome::Rejected(SendRejection::NothingToRetry),
        }
    }

    async fn load_history(&self, conversation_id: ConversationId) -> Result<(), ChatError> {
        if conversation_id.is_transient() {
            return Ok(());
        }

        let generation = {
            let mut state = self.lock();
            if state.view.conversation_id != conversation_id {
                Self::start_new_generation(&mut state);
                state.view.conversation_id = conversation_id;
            } else if state.view.is_sending || state.view.is_loading {
                tracing::debug!(%conversation_id, "History load skipped, session busy");
                return Ok(());
            }
            state.view.is_loading = true;
            state.view.error = None;
            self.publish(&state);
            state.generation
        };

        match self.store.select_messages(conversation_id).await {
            Ok(mut records) => {
                records.sort_by_key(|r| r.id);
                let messages: Vec<Message> =
                    records.into_iter().map(StoredMessage::into_message).collect();
                let message_count = messages.len();
                tracing::debug!(%conversation_id, message_count, "History loaded");

                let applied = self.update(generation, |state| {
                    state.view.messages = messages;
                    state.view.is_loading = false;
                });
                if applied.is_some() {
                    self.request_scroll(message_count);
                }
                Ok(())
            }
            Err(e) => {
                let error = ChatError::HistoryUnavailable(e);
                tracing::warn!(%conversation_id, error = ?error, "History load failed");
                let message = error.to_string();
                self.update(generation, |state| {
                    state.view.error = Some(message);
                    state.view.is_loading = false;
                });
                Err(error)
            }
        }
    }
}

/// The last `turns` messages as `{role, content}` pairs, oldest first.
pub fn history_window(messages: &[Message], turns: usize) -> Vec<HistoryTurn> {
    let start = messages.len().saturating_sub(turns);
    messages[start..]
        .iter()
        .map(|m| HistoryTurn {
            role: m.sender,
            content: m.body.clone(),
        })
        .collect()
}
