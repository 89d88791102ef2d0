//! Chat transcript model and pure list operations.
//!
//! This crate is transport agnostic: it knows nothing about sockets or
//! frames, only about ordered lists of [`ChatMessage`] values.
//!
//! DESIGN
//! ======
//! The free functions are referentially transparent. Stateful concerns live in
//! two small owners: [`MessageIdGen`] scopes id uniqueness to one session, and
//! [`Transcript`] applies streaming merges to a list it owns.
//!
//! ORDERING
//! ========
//! Insertion re-sorts the whole list with a stable sort on `timestamp`. On a
//! timestamp tie, messages already in the list keep their relative order and
//! the inserted message lands after them.

mod ids;
mod session;

pub use ids::MessageIdGen;
pub use session::Transcript;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Histories longer than this are cut down before being sent to a backend.
pub const MAX_CONTEXT: usize = 50;
/// Number of trailing messages kept once [`MAX_CONTEXT`] is exceeded.
pub const WINDOW_SIZE: usize = 20;

/// Error returned by [`deserialize`].
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("failed to decode chat message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Who authored a message. Fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// A single turn in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique within a session.
    pub id: String,
    pub role: Role,
    /// UTF-8 text; grows while an assistant reply is streaming.
    pub content: String,
    /// Milliseconds since the Unix epoch. Sort key for the transcript.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// `Some(true)` while more fragments are expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_streaming: Option<bool>,
    /// Marks a system-originated failure notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp,
            agent_id: None,
            agent_name: None,
            is_streaming: None,
            is_error: None,
        }
    }

    #[must_use]
    pub fn with_agent(mut self, agent_id: impl Into<String>, agent_name: Option<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self.agent_name = agent_name;
        self
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.is_streaming.unwrap_or(false)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Position of a fragment within a streamed reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    StreamStart,
    StreamChunk,
    StreamEnd,
}

/// A transport-level fragment belonging to an in-flight assistant reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub message_id: String,
    /// Only meaningful on [`ChunkKind::StreamChunk`].
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub agent_id: String,
}

/// Bound the history forwarded to a backend for one turn.
///
/// Returns `messages` untouched when it holds at most [`MAX_CONTEXT`] entries,
/// otherwise exactly the last [`WINDOW_SIZE`].
#[must_use]
pub fn context_window(messages: &[ChatMessage]) -> &[ChatMessage] {
    if messages.len() <= MAX_CONTEXT {
        return messages;
    }
    &messages[messages.len() - WINDOW_SIZE..]
}

/// Concatenate the text of every `stream_chunk` fragment, in input order.
///
/// Start and end fragments are skipped without looking at their content, and
/// the input is not required to be well formed.
#[must_use]
pub fn assemble_stream(chunks: &[StreamChunk]) -> String {
    chunks
        .iter()
        .filter(|chunk| chunk.kind == ChunkKind::StreamChunk)
        .map(|chunk| chunk.content.as_str())
        .collect()
}

/// Return a new list holding `messages` plus `message`, sorted by timestamp.
#[must_use]
pub fn insert_ordered(messages: &[ChatMessage], message: ChatMessage) -> Vec<ChatMessage> {
    insert_sorted(messages.to_vec(), message)
}

fn insert_sorted(mut messages: Vec<ChatMessage>, message: ChatMessage) -> Vec<ChatMessage> {
    messages.push(message);
    // `sort_by_key` is stable, which fixes the tie-break documented above.
    messages.sort_by_key(|m| m.timestamp);
    messages
}

/// Encode a message as transport-safe JSON text.
#[must_use]
pub fn serialize(message: &ChatMessage) -> String {
    // Only strings, integers and booleans; serialization cannot fail.
    serde_json::to_string(message).unwrap_or_default()
}

/// Decode a message previously produced by [`serialize`].
///
/// # Errors
///
/// Returns [`TranscriptError::Decode`] when `text` is not a chat message.
pub fn deserialize(text: &str) -> Result<ChatMessage, TranscriptError> {
    Ok(serde_json::from_str(text)?)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
