use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::post;
use bytes::Bytes;
use futures::stream;
use serde_json::json;

use krishi_chat::application::ports::MessageStore;
use krishi_chat::application::services::{
    ChatSession, ChatSettings, ChatSnapshot, ReconcilePolicy, SendOutcome,
};
use krishi_chat::domain::{ConversationId, DeliveryStatus, MessageRole};
use krishi_chat::infrastructure::persistence::InMemoryMessageStore;
use krishi_chat::infrastructure::transport::StreamingChatClient;

use crate::helpers::{signed_in, start_mock_server};

#[derive(Clone, Default)]
struct Backend {
    prompts: Arc<Mutex<Vec<(String, String)>>>,
}

async fn chat(State(backend): State<Backend>, mut multipart: Multipart) -> Response {
    let mut prompt = String::new();
    let mut history = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.unwrap_or_default();
        match name.as_str() {
            "prompt" => prompt = text,
            "history" => history = text,
            _ => {}
        }
    }
    backend.prompts.lock().unwrap().push((prompt, history));

    let body = concat!(
        "data: {\"type\":\"status\",\"message\":\"Searching knowledge base...\"}\n",
        "data: {\"type\":\"metadata\",\"metadata\":{\"url\":\"https://icar.example/rice\"}}\n",
        "data: {\"type\":\"text\",\"chunk\":\"Use neem \"}\n",
        "data: {\"type\":\"text\",\"chunk\":\"oil spray.\"}\n",
        "data: {\"type\":\"complete\"}\n",
    );
    // Split mid-line so the client has to reassemble fragments.
    let (head, tail) = body.split_at(37);
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(head.as_bytes())),
        Ok(Bytes::from_static(tail.as_bytes())),
    ];
    Response::new(Body::from_stream(stream::iter(chunks)))
}

async fn start_backend() -> (Backend, String, tokio::sync::oneshot::Sender<()>) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/chat", post(chat))
        .with_state(backend.clone());
    let (base_url, shutdown_tx) = start_mock_server(app).await;
    (backend, base_url, shutdown_tx)
}

fn fast_settings() -> ChatSettings {
    ChatSettings {
        reconcile: ReconcilePolicy {
            attempts: 3,
            step: Duration::from_millis(20),
        },
        ..ChatSettings::default()
    }
}

async fn wait_for(session: &ChatSession, done: impl Fn(&ChatSnapshot) -> bool) -> ChatSnapshot {
    let mut updates = session.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if done(&snapshot) {
                return snapshot;
            }
            updates.changed().await.expect("session dropped");
        }
    })
    .await
    .expect("snapshot condition not reached")
}

#[tokio::test]
async fn given_streaming_backend_when_sending_then_reply_is_streamed_persisted_and_enriched() {
    let (backend, base_url, shutdown_tx) = start_backend().await;
    let store = Arc::new(InMemoryMessageStore::new().with_enrichment(json!({
        "youtberelated": [{ "title": "Neem oil", "url": "https://youtu.be/neem", "duration": "4:10" }]
    })));
    let transport = Arc::new(StreamingChatClient::new(
        &base_url,
        "/api/chat",
        Duration::from_secs(5),
    ));
    let session = ChatSession::new(store.clone(), transport, signed_in(), fast_settings());

    let outcome = session.send("How to control stem borer?", None).await;

    assert!(matches!(outcome, SendOutcome::Completed), "{outcome:?}");
    let snapshot = session.snapshot();
    assert!(!snapshot.conversation_id.is_transient());
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].sender, MessageRole::User);
    let reply = &snapshot.messages[1];
    assert_eq!(reply.body, "Use neem oil spray.");
    assert_eq!(reply.metadata.urls(), vec!["https://icar.example/rice"]);
    assert!(snapshot.status.is_none());
    assert!(snapshot.streaming_text.is_empty());

    let enriched = wait_for(&session, |s| {
        s.messages.last().is_some_and(|m| !m.metadata.youtube().is_empty())
    })
    .await;
    assert_eq!(
        enriched.messages[1].metadata.youtube()[0].url,
        "https://youtu.be/neem"
    );

    let stored = store.select_messages(snapshot.conversation_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].body, "Use neem oil spray.");

    let prompts = backend.prompts.lock().unwrap().clone();
    assert_eq!(prompts[0].0, "How to control stem borer?");
    assert_eq!(prompts[0].1, "[]");
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_previous_turn_when_sending_follow_up_then_history_is_forwarded() {
    let (backend, base_url, shutdown_tx) = start_backend().await;
    let store = Arc::new(InMemoryMessageStore::new());
    let transport = Arc::new(StreamingChatClient::new(
        &base_url,
        "api/chat",
        Duration::from_secs(5),
    ));
    let session = ChatSession::new(store, transport, signed_in(), fast_settings());

    session.send("first question", None).await;
    let outcome = session.send("second question", None).await;

    assert!(matches!(outcome, SendOutcome::Completed), "{outcome:?}");
    let prompts = backend.prompts.lock().unwrap().clone();
    let history: serde_json::Value = serde_json::from_str(&prompts[1].1).unwrap();
    assert_eq!(
        history,
        json!([
            { "role": "user", "content": "first question" },
            { "role": "assistant", "content": "Use neem oil spray." }
        ])
    );
    assert_eq!(session.snapshot().messages.len(), 4);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_saved_conversation_when_reopened_then_history_matches_store() {
    let (_backend, base_url, shutdown_tx) = start_backend().await;
    let store = Arc::new(InMemoryMessageStore::new());
    let transport = Arc::new(StreamingChatClient::new(
        &base_url,
        "/api/chat",
        Duration::from_secs(5),
    ));
    let first = ChatSession::new(store.clone(), transport.clone(), signed_in(), fast_settings());
    first.send("Which fertilizer for wheat?", None).await;
    let conversation_id = first.snapshot().conversation_id;

    let reopened = ChatSession::new(store, transport, signed_in(), fast_settings());
    reopened.load_history(conversation_id).await.unwrap();

    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.conversation_id, conversation_id);
    let bodies: Vec<&str> = snapshot.messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["Which fertilizer for wheat?", "Use neem oil spray."]);
    assert!(snapshot.messages.iter().all(|m| m.status == DeliveryStatus::Sent));
    assert_ne!(conversation_id, ConversationId::default());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_unreachable_backend_when_sending_then_error_shown_and_user_message_kept() {
    let store = Arc::new(InMemoryMessageStore::new());
    let transport = Arc::new(StreamingChatClient::new(
        "http://127.0.0.1:1",
        "/api/chat",
        Duration::from_secs(2),
    ));
    let session = ChatSession::new(store, transport, signed_in(), fast_settings());

    let outcome = session.send("Is it going to rain?", None).await;

    assert!(matches!(outcome, SendOutcome::Failed(_)), "{outcome:?}");
    let snapshot = session.snapshot();
    assert!(snapshot.error.is_some());
    assert!(!snapshot.is_sending);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].body, "Is it going to rain?");
}
