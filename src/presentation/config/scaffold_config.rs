use std::time::Duration;

/// Configuration for scaffold mode operation: no backend, no store, a
/// canned reply streamed at `mock_response_delay_ms` per chunk.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub enabled: bool,
    pub mock_response_delay_ms: u64,
}

impl ScaffoldConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.mock_response_delay_ms)
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("SCAFFOLD_MODE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            mock_response_delay_ms: std::env::var("MOCK_RESPONSE_DELAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(40),
        }
    }
}
