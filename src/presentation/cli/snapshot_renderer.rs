use std::collections::HashSet;
use std::fmt::Write;

use crate::application::services::ChatSnapshot;
use crate::domain::{ConversationId, DeliveryStatus, Message, MessageId, MessageRole, Metadata};

/// Turns successive snapshots into terminal output. Only the difference
/// against what was already printed is emitted, so intermediate snapshots
/// may be skipped without losing text.
#[derive(Debug, Default)]
pub struct SnapshotRenderer {
    conversation_id: Option<ConversationId>,
    shown_messages: usize,
    streamed: String,
    status: Option<String>,
    error: Option<String>,
    sources_shown: HashSet<MessageId>,
    failures_shown: HashSet<MessageId>,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &ChatSnapshot) -> String {
        let mut out = String::new();

        if self.conversation_id != Some(snapshot.conversation_id)
            || snapshot.messages.len() < self.shown_messages
        {
            self.start_conversation(&mut out, snapshot);
        }

        for message in &snapshot.messages[self.shown_messages..] {
            self.render_message(&mut out, message);
        }
        self.shown_messages = snapshot.messages.len();

        for message in &snapshot.messages {
            if message.sender == MessageRole::Assistant
                && !message.metadata.is_empty()
                && self.sources_shown.insert(message.id.clone())
            {
                out.push_str("  (sources arrived)\n");
                render_sources(&mut out, &message.metadata);
            }
            if message.status == DeliveryStatus::Failed
                && self.failures_shown.insert(message.id.clone())
            {
                out.push_str("  (reply not saved)\n");
            }
        }

        if !snapshot.streaming_text.starts_with(self.streamed.as_str()) {
            out.push('\n');
            self.streamed.clear();
        }

        if snapshot.status != self.status {
            if let Some(status) = &snapshot.status {
                let _ = writeln!(out, "[{}]", status);
            }
            self.status = snapshot.status.clone();
        }

        let delta = &snapshot.streaming_text[self.streamed.len()..];
        if !delta.is_empty() {
            if self.streamed.is_empty() {
                out.push_str("assistant> ");
            }
            out.push_str(delta);
            self.streamed.push_str(delta);
        }

        if snapshot.error != self.error {
            if let Some(error) = &snapshot.error {
                let _ = writeln!(out, "! {} (/retry to resend, /dismiss to clear)", error);
            }
            self.error = snapshot.error.clone();
        }

        out
    }

    fn start_conversation(&mut self, out: &mut String, snapshot: &ChatSnapshot) {
        if !self.streamed.is_empty() {
            out.push('\n');
        }
        match (&snapshot.conversation_title, snapshot.conversation_id.is_transient()) {
            (_, true) => out.push_str("=== new conversation ===\n"),
            (Some(title), false) => {
                let _ = writeln!(out, "=== conversation {}: {} ===", snapshot.conversation_id, title);
            }
            (None, false) => {
                let _ = writeln!(out, "=== conversation {} ===", snapshot.conversation_id);
            }
        }
        self.conversation_id = Some(snapshot.conversation_id);
        self.shown_messages = 0;
        self.streamed.clear();
        self.status = None;
        self.sources_shown.clear();
        self.failures_shown.clear();
    }

    fn render_message(&mut self, out: &mut String, message: &Message) {
        match message.sender {
            MessageRole::User => {
                let _ = writeln!(out, "you> {}", message.body);
            }
            MessageRole::Assistant => {
                let rest = if self.streamed.is_empty() {
                    None
                } else {
                    message.body.strip_prefix(self.streamed.as_str())
                };
                match rest {
                    Some(rest) => {
                        out.push_str(rest);
                        out.push('\n');
                    }
                    None => {
                        if !self.streamed.is_empty() {
                            out.push('\n');
                        }
                        let _ = writeln!(out, "assistant> {}", message.body);
                    }
                }
                self.streamed.clear();
                if !message.metadata.is_empty() {
                    self.sources_shown.insert(message.id.clone());
                    render_sources(out, &message.metadata);
                }
            }
        }
    }
}

fn render_sources(out: &mut String, metadata: &Metadata) {
    for url in metadata.urls() {
        let _ = writeln!(out, "  source: {}", url);
    }
    for video in metadata.youtube() {
        match &video.duration {
            Some(duration) => {
                let _ = writeln!(out, "  video: {} ({}) {}", video.title, duration, video.url);
            }
            None => {
                let _ = writeln!(out, "  video: {} {}", video.title, video.url);
            }
        }
    }
}
