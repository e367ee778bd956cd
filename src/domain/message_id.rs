use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Client-side id for a message that has no server row yet.
    pub fn pending() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "local-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn from_server(id: i64) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric server id, if this id came from the store.
    pub fn server_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
