use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned conversation identity. `-1` marks a conversation that has
/// not been created in the store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(i64);

impl ConversationId {
    pub const TRANSIENT: Self = Self(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_transient(&self) -> bool {
        self.0 < 0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::TRANSIENT
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
