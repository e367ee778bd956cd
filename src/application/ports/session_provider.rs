use chrono::{DateTime, Utc};

use crate::domain::UserId;

/// Source of the signed-in user's session. Implemented outside the core by
/// whatever auth client the host application uses.
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<AuthSession>;
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn new(access_token: impl Into<String>, user_id: UserId) -> Self {
        Self {
            access_token: access_token.into(),
            user_id,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn validate(self, now: DateTime<Utc>) -> Result<Self, AuthError> {
        if self.access_token.trim().is_empty() {
            return Err(AuthError::NoSession);
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(AuthError::Expired),
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("You are not signed in. Please sign in to continue.")]
    NoSession,
    #[error("Your session has expired. Please sign in again.")]
    Expired,
}
