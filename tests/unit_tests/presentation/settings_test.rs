use std::time::Duration;

use krishi_chat::application::services::BackendErrorPolicy;
use krishi_chat::presentation::config::{Environment, Settings, StoreProvider};

#[test]
fn given_minimal_settings_when_loading_then_defaults_applied() {
    let settings = Settings::from_toml(
        r#"
        [backend]
        base_url = "http://localhost:8000"

        [store]
        provider = "memory"
        "#,
    )
    .unwrap();

    assert_eq!(settings.backend.chat_path, "/chat");
    assert_eq!(settings.backend.request_timeout(), Duration::from_secs(60));
    assert_eq!(settings.store.provider, StoreProvider::Memory);

    let chat = settings.chat.to_chat_settings();
    assert_eq!(chat.history_turns, 5);
    assert_eq!(chat.title_max_chars, 20);
    assert_eq!(chat.backend_errors, BackendErrorPolicy::Ignore);
    assert_eq!(chat.reconcile.attempts, 5);
    assert_eq!(chat.reconcile.step, Duration::from_millis(1000));
    assert!(!settings.logging.json);
}

#[test]
fn given_overrides_when_loading_then_chat_settings_follow() {
    let settings = Settings::from_toml(
        r#"
        [backend]
        base_url = "https://api.example"
        request_timeout_secs = 30

        [store]
        provider = "supabase"
        url = "https://proj.supabase.co"
        api_key = "anon"

        [chat]
        backend_errors = "surface"
        reconcile_attempts = 3
        reconcile_step_ms = 250
        "#,
    )
    .unwrap();

    let chat = settings.chat.to_chat_settings();
    assert_eq!(chat.backend_errors, BackendErrorPolicy::Surface);
    assert_eq!(chat.reconcile.delay_for(2), Duration::from_millis(500));
    assert_eq!(settings.store.provider, StoreProvider::Supabase);
}

#[test]
fn given_unknown_store_provider_when_loading_then_error() {
    let result = Settings::from_toml(
        r#"
        [backend]
        base_url = "x"
        [store]
        provider = "sqlite"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn given_environment_names_when_parsing_then_maps_to_settings_file() {
    let env = Environment::try_from("Production".to_string()).unwrap();
    assert_eq!(env, Environment::Prod);
    assert_eq!(env.settings_file(), "appsettings.prod");
    assert!(Environment::try_from("staging".to_string()).is_err());
}
