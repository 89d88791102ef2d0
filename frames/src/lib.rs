//! Shared frame model and JSON codec for the studio chat socket.
//!
//! This crate owns the wire representation exchanged with the HiveMind
//! backend. Every frame is a JSON object tagged by `type`, and exactly one
//! frame travels per transport message.
//!
//! DESIGN
//! ======
//! Outgoing and incoming frames are separate enums because the two directions
//! share no variants. Optional members use `#[serde(default)]` so a backend
//! that omits them never causes a decode failure; unknown extra fields are
//! ignored, while an unknown `type` is a decode error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text was not valid JSON or did not match any known frame shape.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Free-form metrics attached to `response` and `stream_end` frames.
pub type Metrics = Map<String, Value>;

/// How the backend should resolve model credentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Use whatever the backend process environment provides.
    #[default]
    Env,
    /// Use a named credentials profile on the backend host.
    Profile,
    /// Use explicit access keys carried in the config.
    Keys,
}

/// Credentials and model selection forwarded with chat traffic.
///
/// The client never interprets these values; they are opaque to everything
/// except the backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub auth_mode: AuthMode,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthConfig")
            .field("auth_mode", &self.auth_mode)
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("model_id", &self.model_id)
            .finish()
    }
}

/// One `{role, content}` pair of conversation history sent with a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: String,
    pub content: String,
}

/// Frames sent from the client to the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    /// A user turn addressed to an agent, with bounded history.
    Message {
        agent_id: String,
        message: String,
        #[serde(default)]
        include_briefing: bool,
        #[serde(default)]
        context: Vec<ContextEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_config: Option<AuthConfig>,
    },
    /// Ask the backend to route subsequent turns to another agent.
    SwitchAgent { agent_id: String },
    /// Replace the credentials used for this socket session.
    SetAuth { auth_config: AuthConfig },
}

/// Frames sent from the backend to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingFrame {
    /// A complete, non-streamed assistant reply.
    Response {
        #[serde(default)]
        agent_id: String,
        message: String,
        #[serde(default)]
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<Metrics>,
    },
    /// Opens a streamed reply identified by `message_id`.
    StreamStart {
        message_id: String,
        #[serde(default)]
        agent_id: String,
    },
    /// One text fragment of an open stream.
    StreamChunk {
        message_id: String,
        #[serde(default)]
        content: String,
    },
    /// Closes the stream identified by `message_id`.
    StreamEnd {
        message_id: String,
        #[serde(default)]
        agent_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<Metrics>,
    },
    /// Backend-side failure reported to the user.
    Error { message: String },
    /// Confirms that subsequent turns go to a different agent.
    AgentSwitched {
        agent_id: String,
        #[serde(default)]
        agent_name: String,
    },
    /// Result of validating the credentials supplied via `set_auth`.
    AuthStatus {
        ok: bool,
        #[serde(default)]
        message: String,
    },
}

impl IncomingFrame {
    /// The wire `type` tag of this frame.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Response { .. } => "response",
            Self::StreamStart { .. } => "stream_start",
            Self::StreamChunk { .. } => "stream_chunk",
            Self::StreamEnd { .. } => "stream_end",
            Self::Error { .. } => "error",
            Self::AgentSwitched { .. } => "agent_switched",
            Self::AuthStatus { .. } => "auth_status",
        }
    }
}

impl OutgoingFrame {
    /// The wire `type` tag of this frame.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::SwitchAgent { .. } => "switch_agent",
            Self::SetAuth { .. } => "set_auth",
        }
    }
}

/// Encode an outgoing frame into its JSON text form.
#[must_use]
pub fn encode_frame(frame: &OutgoingFrame) -> String {
    // Every field is a string, bool, list, or string-keyed map, so JSON
    // serialization cannot fail here.
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode one inbound transport message into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, a missing or unknown
/// `type`, or a missing required member.
pub fn decode_frame(text: &str) -> Result<IncomingFrame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
