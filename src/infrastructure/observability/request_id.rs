use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlates one chat turn across client logs and backend logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
