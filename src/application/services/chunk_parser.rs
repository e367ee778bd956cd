use serde_json::Value;

use crate::domain::Metadata;

use super::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const PREVIEW_CHARS: usize = 80;
const MAX_PENDING_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("not a json object")]
    NotAnObject,
    #[error("missing string `type` field")]
    MissingType,
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("missing `{0}` field")]
    MissingField(&'static str),
}

/// Decodes a single line of the response body.
///
/// `Ok(None)` means the line carries nothing to apply: blank lines, the
/// `[DONE]` sentinel, and status events without a message.
pub fn decode_line(line: &str) -> Result<Option<StreamEvent>, LineError> {
    let mut payload = line.trim();
    if let Some(rest) = payload.strip_prefix(DATA_PREFIX) {
        payload = rest.trim_start();
    }
    if payload.is_empty() || payload == DONE_SENTINEL {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(payload).map_err(|e| LineError::InvalidJson(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(LineError::NotAnObject);
    };
    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or(LineError::MissingType)?;

    let text_field = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

    match kind {
        "status" => Ok(text_field("message")
            .filter(|m| !m.trim().is_empty())
            .map(StreamEvent::Status)),
        "metadata" => fields
            .get("metadata")
            .filter(|m| m.is_object())
            .map(|m| Some(StreamEvent::Metadata(Metadata::normalize(m))))
            .ok_or(LineError::MissingField("metadata")),
        "text" => text_field("chunk")
            .map(|chunk| Some(StreamEvent::Text(chunk)))
            .ok_or(LineError::MissingField("chunk")),
        "complete" => Ok(Some(StreamEvent::Complete)),
        "error" => Ok(Some(StreamEvent::Error(
            text_field("error").or_else(|| text_field("message")),
        ))),
        other => Err(LineError::UnknownType(other.to_string())),
    }
}

/// Turns raw body chunks into events, one chunk at a time.
///
/// Chunks need not end on a line boundary. A trailing fragment that already
/// decodes is applied immediately; otherwise it is held and joined with the
/// start of the next chunk. Undecodable lines are logged and skipped.
#[derive(Debug, Default)]
pub struct ChunkParser {
    pending: String,
    skipped: usize,
}

impl ChunkParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let mut lines: Vec<&str> = chunk.split('\n').collect();
        let tail = lines.pop().unwrap_or_default();

        for (index, line) in lines.into_iter().enumerate() {
            if index == 0 && !self.pending.is_empty() {
                let carried = std::mem::take(&mut self.pending);
                self.push_joined(&carried, line, &mut events);
            } else {
                self.push_line(line, &mut events);
            }
        }

        if !tail.is_empty() {
            let carried = std::mem::take(&mut self.pending);
            let joined = format!("{carried}{tail}");
            // Only a newline proves a held fragment was garbage; until then keep joining.
            match decode_line(&joined) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(LineError::InvalidJson(_)) => self.hold(joined),
                Err(e) => self.skip(&joined, &e),
            }
        }

        events
    }

    /// Flushes a fragment still held when the body ends.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let fragment = std::mem::take(&mut self.pending);
        let mut events = Vec::new();
        self.push_line(&fragment, &mut events);
        events
    }

    /// Number of lines dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn push_joined(&mut self, carried: &str, line: &str, events: &mut Vec<StreamEvent>) {
        let joined = format!("{carried}{line}");
        match decode_line(&joined) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(LineError::InvalidJson(_)) => {
                self.skip(carried, &unterminated());
                self.push_line(line, events);
            }
            Err(e) => self.skip(&joined, &e),
        }
    }

    fn push_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        match decode_line(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => self.skip(line, &e),
        }
    }

    fn hold(&mut self, fragment: String) {
        if fragment.len() > MAX_PENDING_BYTES {
            self.skip(&fragment, &LineError::InvalidJson("fragment too large".into()));
        } else {
            self.pending = fragment;
        }
    }

    fn skip(&mut self, line: &str, error: &LineError) {
        self.skipped += 1;
        let preview: String = line.trim().chars().take(PREVIEW_CHARS).collect();
        tracing::debug!(
            reason = %error,
            line = %preview,
            skipped_total = self.skipped,
            "Skipping stream fragment"
        );
    }
}

fn unterminated() -> LineError {
    LineError::InvalidJson("unterminated fragment".into())
}
