use chrono::{Duration, Utc};

use krishi_chat::application::ports::{AuthError, AuthSession};
use krishi_chat::domain::UserId;

#[test]
fn given_valid_session_when_validating_then_accepted() {
    let session = AuthSession::new("token", UserId::new("u1"))
        .with_expiry(Utc::now() + Duration::minutes(5));
    assert!(session.validate(Utc::now()).is_ok());
}

#[test]
fn given_expired_session_when_validating_then_expired() {
    let now = Utc::now();
    let session = AuthSession::new("token", UserId::new("u1")).with_expiry(now);
    assert_eq!(session.validate(now).unwrap_err(), AuthError::Expired);
}

#[test]
fn given_blank_token_when_validating_then_no_session() {
    let session = AuthSession::new("  ", UserId::new("u1"));
    assert_eq!(session.validate(Utc::now()).unwrap_err(), AuthError::NoSession);
}
