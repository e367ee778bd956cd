use std::time::Duration;

use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

use crate::application::services::{BackendErrorPolicy, ChatSettings, ReconcilePolicy};

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub backend: BackendSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    Supabase,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub provider: StoreProvider,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default)]
    pub backend_errors: BackendErrorPolicy,
    #[serde(default = "default_reconcile_attempts")]
    pub reconcile_attempts: u32,
    #[serde(default = "default_reconcile_step_ms")]
    pub reconcile_step_ms: u64,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            backend_errors: BackendErrorPolicy::default(),
            reconcile_attempts: default_reconcile_attempts(),
            reconcile_step_ms: default_reconcile_step_ms(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

impl ChatSection {
    pub fn to_chat_settings(&self) -> ChatSettings {
        ChatSettings {
            history_turns: self.history_turns,
            title_max_chars: self.title_max_chars,
            backend_errors: self.backend_errors,
            reconcile: ReconcilePolicy {
                attempts: self.reconcile_attempts,
                step: Duration::from_millis(self.reconcile_step_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub json: bool,
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_connections() -> u32 {
    5
}

fn default_history_turns() -> usize {
    5
}

fn default_reconcile_attempts() -> u32 {
    5
}

fn default_reconcile_step_ms() -> u64 {
    1000
}

fn default_title_max_chars() -> usize {
    20
}

impl Settings {
    /// Layers `appsettings.<env>.toml` (optional) under `APP_` environment
    /// variables, e.g. `APP_BACKEND__BASE_URL`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&environment.settings_file()).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
