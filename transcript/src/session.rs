//! Owned conversation list with streaming merges.

use crate::{ChatMessage, Role, context_window, insert_sorted};

/// One conversation's messages, kept sorted by timestamp.
///
/// Stream operations address messages by id. Fragments for an id that was
/// never started (or already removed) are ignored and reported via `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    streaming_id: Option<String>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Id of the reply currently streaming, if any.
    #[must_use]
    pub fn streaming_id(&self) -> Option<&str> {
        self.streaming_id.as_deref()
    }

    /// History to forward with the next turn.
    #[must_use]
    pub fn context(&self) -> &[ChatMessage] {
        context_window(&self.messages)
    }

    /// Insert a message at its chronological position.
    pub fn push(&mut self, message: ChatMessage) {
        let messages = std::mem::take(&mut self.messages);
        self.messages = insert_sorted(messages, message);
    }

    /// Insert a complete reply; any open stream is no longer tracked.
    pub fn push_response(&mut self, message: ChatMessage) {
        self.push(message);
        self.streaming_id = None;
    }

    /// Add an empty assistant placeholder for a stream that just opened.
    ///
    /// Returns `false` without changes when `message_id` is already present.
    pub fn start_stream(&mut self, message_id: &str, agent_id: &str, timestamp: i64) -> bool {
        if self.get(message_id).is_some() {
            return false;
        }
        let mut placeholder = ChatMessage::new(message_id, Role::Assistant, String::new(), timestamp);
        if !agent_id.is_empty() {
            placeholder.agent_id = Some(agent_id.to_owned());
        }
        placeholder.is_streaming = Some(true);
        self.push(placeholder);
        self.streaming_id = Some(message_id.to_owned());
        true
    }

    /// Append a fragment to a streaming message.
    pub fn append_chunk(&mut self, message_id: &str, content: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.content.push_str(content);
                true
            }
            None => false,
        }
    }

    /// Mark a stream as finished.
    pub fn end_stream(&mut self, message_id: &str) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        message.is_streaming = Some(false);
        if self.streaming_id.as_deref() == Some(message_id) {
            self.streaming_id = None;
        }
        true
    }

    /// Insert a system failure notice. Ends tracking of any open stream.
    pub fn push_error(&mut self, id: impl Into<String>, content: impl Into<String>, timestamp: i64) {
        let mut notice = ChatMessage::new(id, Role::System, content, timestamp);
        notice.is_error = Some(true);
        self.push(notice);
        self.streaming_id = None;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
