use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use krishi_chat::application::ports::{AuthSession, ChatTransport, MessageStore, SessionProvider};
use krishi_chat::application::services::{ChatSession, ChatSettings};
use krishi_chat::domain::{ConversationId, UserId};
use krishi_chat::infrastructure::auth::StaticSessionProvider;
use krishi_chat::infrastructure::observability::{TracingConfig, init_tracing};
use krishi_chat::infrastructure::persistence::{
    InMemoryMessageStore, PgMessageStore, SupabaseMessageStore, create_pool,
};
use krishi_chat::infrastructure::transport::{ScaffoldChatTransport, StreamingChatClient};
use krishi_chat::presentation::config::StoreProvider;
use krishi_chat::presentation::{ChatRepl, CliArgs, Environment, ScaffoldConfig, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let environment =
        Environment::try_from(args.environment.clone()).map_err(anyhow::Error::msg)?;

    let mut scaffold = ScaffoldConfig::default();
    scaffold.enabled |= args.scaffold;

    let session = if scaffold.enabled {
        init_tracing(&TracingConfig::new(environment.as_str(), false));
        scaffold_session(&scaffold)
    } else {
        let settings = Settings::load(environment).context("loading settings")?;
        init_tracing(&TracingConfig::new(environment.as_str(), settings.logging.json));
        backend_session(&settings).await?
    };

    if let Some(id) = args.conversation {
        if let Err(e) = session.load_history(ConversationId::new(id)).await {
            tracing::warn!(conversation_id = id, error = %e, "Could not open conversation");
        }
    }

    ChatRepl::new(session).run().await
}

fn scaffold_session(scaffold: &ScaffoldConfig) -> ChatSession {
    tracing::info!(delay_ms = scaffold.mock_response_delay_ms, "Scaffold mode");

    let sessions: Arc<dyn SessionProvider> = Arc::new(StaticSessionProvider::new(Some(
        AuthSession::new("scaffold-token", UserId::new("scaffold-user")),
    )));
    let store: Arc<dyn MessageStore> = Arc::new(InMemoryMessageStore::new().with_enrichment(
        json!({
            "youtube": [{
                "title": "Drip irrigation basics",
                "url": "https://www.youtube.com/watch?v=scaffold",
                "duration": 272
            }]
        }),
    ));
    let transport: Arc<dyn ChatTransport> =
        Arc::new(ScaffoldChatTransport::new(scaffold.chunk_delay()));

    ChatSession::new(store, transport, sessions, ChatSettings::default())
}

async fn backend_session(settings: &Settings) -> anyhow::Result<ChatSession> {
    let session = (!settings.auth.access_token.is_empty()).then(|| {
        AuthSession::new(
            settings.auth.access_token.clone(),
            UserId::new(settings.auth.user_id.clone()),
        )
    });
    if session.is_none() {
        tracing::warn!("No access token configured, sending will fail until one is provided");
    }
    let sessions: Arc<dyn SessionProvider> = Arc::new(StaticSessionProvider::new(session));

    let store: Arc<dyn MessageStore> = match settings.store.provider {
        StoreProvider::Supabase => Arc::new(SupabaseMessageStore::new(
            &settings.store.url,
            &settings.store.api_key,
            Arc::clone(&sessions),
        )),
        StoreProvider::Postgres => {
            let pool = create_pool(&settings.store.database_url, settings.store.max_connections)
                .await
                .context("connecting to the message store")?;
            let store = PgMessageStore::new(pool);
            store.migrate().await.context("running migrations")?;
            Arc::new(store)
        }
        StoreProvider::Memory => Arc::new(InMemoryMessageStore::new()),
    };

    let transport: Arc<dyn ChatTransport> = Arc::new(StreamingChatClient::new(
        &settings.backend.base_url,
        &settings.backend.chat_path,
        settings.backend.request_timeout(),
    ));
    tracing::info!(
        backend = %settings.backend.base_url,
        store = ?settings.store.provider,
        "Chat backend configured"
    );

    Ok(ChatSession::new(
        store,
        transport,
        sessions,
        settings.chat.to_chat_settings(),
    ))
}
