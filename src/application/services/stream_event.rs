use crate::domain::Metadata;

/// One decoded event of the chat response body.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(String),
    Metadata(Metadata),
    Text(String),
    Complete,
    Error(Option<String>),
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status(_) => "status",
            StreamEvent::Metadata(_) => "metadata",
            StreamEvent::Text(_) => "text",
            StreamEvent::Complete => "complete",
            StreamEvent::Error(_) => "error",
        }
    }
}
