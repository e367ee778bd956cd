#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected by store: {0}")]
    Rejected(String),
}
