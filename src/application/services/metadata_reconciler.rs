use std::sync::Arc;

use crate::application::ports::MessageStore;
use crate::domain::{ConversationId, Metadata};

use super::ReconcilePolicy;

/// Polls the store for enrichment attached to an assistant message after the
/// stream has finished. Failures stay internal.
pub struct MetadataReconciler {
    store: Arc<dyn MessageStore>,
    policy: ReconcilePolicy,
}

impl MetadataReconciler {
    pub fn new(store: Arc<dyn MessageStore>, policy: ReconcilePolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the first non-empty metadata found on the latest assistant
    /// row, or `None` once every attempt is used. When `expected_row` is set,
    /// rows with a different id are ignored.
    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn poll(
        &self,
        conversation_id: ConversationId,
        expected_row: Option<i64>,
    ) -> Option<Metadata> {
        for attempt in 1..=self.policy.attempts {
            tokio::time::sleep(self.policy.delay_for(attempt)).await;

            match self
                .store
                .select_latest_assistant_message(conversation_id)
                .await
            {
                Ok(Some(record)) => {
                    if expected_row.is_some_and(|id| id != record.id) {
                        tracing::debug!(attempt, row_id = record.id, "Latest assistant row is not ours yet");
                        continue;
                    }
                    let metadata = record.normalized_metadata();
                    if !metadata.is_empty() {
                        tracing::debug!(attempt, "Metadata found");
                        return Some(metadata);
                    }
                    tracing::debug!(attempt, "No metadata yet");
                }
                Ok(None) => tracing::debug!(attempt, "No assistant row yet"),
                Err(e) => tracing::warn!(attempt, error = %e, "Metadata poll failed"),
            }
        }

        tracing::debug!(attempts = self.policy.attempts, "Metadata polling exhausted");
        None
    }
}
