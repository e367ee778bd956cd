use std::time::Duration;

use serde::Deserialize;

/// What to do with `{"type":"error"}` events sent by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendErrorPolicy {
    /// Log and keep streaming.
    #[default]
    Ignore,
    /// Show the backend's message and end the turn.
    Surface,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub history_turns: usize,
    pub title_max_chars: usize,
    pub backend_errors: BackendErrorPolicy,
    pub reconcile: ReconcilePolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_turns: 5,
            title_max_chars: 20,
            backend_errors: BackendErrorPolicy::Ignore,
            reconcile: ReconcilePolicy::default(),
        }
    }
}

/// Linear backoff for metadata polling: attempt `n` waits `n * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub attempts: u32,
    pub step: Duration,
}

impl ReconcilePolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            step: Duration::from_millis(1000),
        }
    }
}
