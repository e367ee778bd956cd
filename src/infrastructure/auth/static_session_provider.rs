use std::sync::{PoisonError, RwLock};

use crate::application::ports::{AuthSession, SessionProvider};

/// Holds a session supplied from configuration. Sign-in flows live outside
/// this crate; they hand their result over through `replace`.
#[derive(Default)]
pub struct StaticSessionProvider {
    session: RwLock<Option<AuthSession>>,
}

impl StaticSessionProvider {
    pub fn new(session: Option<AuthSession>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub fn replace(&self, session: AuthSession) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn sign_out(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for StaticSessionProvider {
    fn current_session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
