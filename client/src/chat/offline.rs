//! Canned replies used while the backend is unreachable.

use transcript::{ChatMessage, MessageIdGen, Role};

const DEFAULT_REPLY: &str =
    "I'm currently in offline mode. Connect to the backend to chat with real HiveMind agents.";

/// Checked in order; the first keyword contained in the message wins.
const KEYWORD_REPLIES: &[(&str, &str)] = &[
    (
        "hello",
        "Hey there! I'm running in offline mode right now. Once you connect to the backend, I can help with infrastructure design, deployments, and more.",
    ),
    (
        "help",
        "In offline mode, I can only provide canned responses. Connect to the backend for real agent capabilities:\n- **Recon**: Scans repos and discovers infrastructure\n- **Conductor**: Orchestrates deployments and workflows\n- **Janitor**: Cleans up unused resources",
    ),
    (
        "deploy",
        "Deployment requires a live backend connection. Please check your API settings and ensure the server is running.",
    ),
    (
        "infrastructure",
        "I'd love to help design infrastructure, but I need a live backend connection. Start the server and I'll connect automatically.",
    ),
];

/// Reply text for `content`, matched case-insensitively.
#[must_use]
pub fn canned_reply(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    KEYWORD_REPLIES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(DEFAULT_REPLY, |(_, reply)| *reply)
}

/// Name shown on offline replies. Only three personas exist offline.
#[must_use]
pub fn offline_agent_name(agent_id: &str) -> &'static str {
    match agent_id {
        "recon" => "Recon",
        "conductor" => "Conductor",
        _ => "Janitor",
    }
}

/// Build the assistant message answering `content` while offline.
#[must_use]
pub fn offline_reply(content: &str, agent_id: &str, ids: &MessageIdGen, now_ms: i64) -> ChatMessage {
    ChatMessage::new(ids.next_id(now_ms), Role::Assistant, canned_reply(content), now_ms)
        .with_agent(agent_id, Some(offline_agent_name(agent_id).to_owned()))
}

#[cfg(test)]
#[path = "offline_test.rs"]
mod offline_test;
