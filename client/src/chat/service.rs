//! Chat dispatcher: outbound turns and inbound frame routing.
//!
//! DESIGN
//! ======
//! `ChatService` never owns the transcript. Outbound, it frames user turns
//! with a bounded context window, or answers locally when the socket is not
//! connected. Inbound, it maps each frame to exactly one [`ChatEvents`]
//! callback and leaves merging to the caller.
//!
//! Callbacks run without any internal lock held, so they may call back into
//! the service.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use frames::{AuthConfig, ContextEntry, IncomingFrame, OutgoingFrame};
use tracing::debug;
use transcript::{ChatMessage, MessageIdGen, Role, context_window, now_ms};

use super::offline::offline_reply;
use crate::config::DEFAULT_AGENT_ID;
use crate::net::socket::{MessageHandler, SocketClient};

/// Where outbound frames go.
pub trait FrameSink: Send + Sync {
    fn is_connected(&self) -> bool;
    fn send(&self, frame: &OutgoingFrame);
}

impl FrameSink for SocketClient {
    fn is_connected(&self) -> bool {
        SocketClient::is_connected(self)
    }

    fn send(&self, frame: &OutgoingFrame) {
        SocketClient::send(self, frame);
    }
}

/// UI-facing notifications. One call per inbound frame.
pub trait ChatEvents: Send + Sync {
    /// A complete assistant reply, from the backend or the offline fallback.
    fn on_response(&self, message: ChatMessage);
    fn on_stream_start(&self, message_id: &str, agent_id: &str);
    fn on_stream_chunk(&self, message_id: &str, content: &str);
    fn on_stream_end(&self, message_id: &str, agent_id: &str);
    fn on_error(&self, message: &str);
    fn on_agent_switched(&self, agent_id: &str, agent_name: &str);
    fn on_auth_status(&self, _ok: bool, _message: &str) {}
}

struct ChatState {
    active_agent_id: String,
    auth_config: Option<AuthConfig>,
}

pub struct ChatService<S> {
    sink: S,
    events: Arc<dyn ChatEvents>,
    state: Mutex<ChatState>,
    ids: MessageIdGen,
    offline_ids: MessageIdGen,
}

impl<S: FrameSink> ChatService<S> {
    pub fn new(sink: S, events: Arc<dyn ChatEvents>) -> Self {
        Self {
            sink,
            events,
            state: Mutex::new(ChatState {
                active_agent_id: DEFAULT_AGENT_ID.to_owned(),
                auth_config: None,
            }),
            ids: MessageIdGen::new("msg"),
            offline_ids: MessageIdGen::new("mock"),
        }
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn active_agent_id(&self) -> String {
        self.lock().active_agent_id.clone()
    }

    #[must_use]
    pub fn auth_config(&self) -> Option<AuthConfig> {
        self.lock().auth_config.clone()
    }

    /// Change the addressed agent locally without telling the backend.
    pub fn set_active_agent(&self, agent_id: &str) {
        self.lock().active_agent_id = agent_id.to_owned();
    }

    /// Store credentials for later turns and push them to a live session.
    pub fn set_auth_config(&self, config: AuthConfig) {
        self.lock().auth_config = Some(config.clone());
        if self.sink.is_connected() {
            self.sink.send(&OutgoingFrame::SetAuth { auth_config: config });
        }
    }

    /// Send a user turn, or answer it locally while disconnected.
    ///
    /// `history` is the conversation so far; only its context window is
    /// forwarded.
    pub fn send_message(&self, content: &str, history: &[ChatMessage]) {
        let (agent_id, auth_config) = {
            let state = self.lock();
            (state.active_agent_id.clone(), state.auth_config.clone())
        };

        if !self.sink.is_connected() {
            debug!(agent_id = %agent_id, "socket offline; answering locally");
            let reply = offline_reply(content, &agent_id, &self.offline_ids, now_ms());
            self.events.on_response(reply);
            return;
        }

        let context = context_window(history)
            .iter()
            .map(|message| ContextEntry {
                role: message.role.as_str().to_owned(),
                content: message.content.clone(),
            })
            .collect();
        self.sink.send(&OutgoingFrame::Message {
            agent_id,
            message: content.to_owned(),
            include_briefing: false,
            context,
            auth_config,
        });
    }

    /// Address `agent_id` from now on and tell a live backend.
    pub fn switch_agent(&self, agent_id: &str) {
        self.set_active_agent(agent_id);
        if self.sink.is_connected() {
            self.sink.send(&OutgoingFrame::SwitchAgent {
                agent_id: agent_id.to_owned(),
            });
        }
    }

    /// Route one inbound frame to its callback.
    pub fn handle_incoming(&self, frame: &IncomingFrame) {
        match frame {
            IncomingFrame::Response {
                agent_id, message, ..
            } => {
                let now = now_ms();
                let id = self.ids.next_id(now);
                let mut reply = ChatMessage::new(id, Role::Assistant, message.clone(), now);
                if !agent_id.is_empty() {
                    reply.agent_id = Some(agent_id.clone());
                }
                self.events.on_response(reply);
            }
            IncomingFrame::StreamStart {
                message_id,
                agent_id,
            } => self.events.on_stream_start(message_id, agent_id),
            IncomingFrame::StreamChunk {
                message_id,
                content,
            } => self.events.on_stream_chunk(message_id, content),
            IncomingFrame::StreamEnd {
                message_id,
                agent_id,
                ..
            } => self.events.on_stream_end(message_id, agent_id),
            IncomingFrame::Error { message } => self.events.on_error(message),
            IncomingFrame::AgentSwitched {
                agent_id,
                agent_name,
            } => {
                self.set_active_agent(agent_id);
                self.events.on_agent_switched(agent_id, agent_name);
            }
            IncomingFrame::AuthStatus { ok, message } => self.events.on_auth_status(*ok, message),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: FrameSink + 'static> ChatService<S> {
    /// Feed every frame `socket` decodes into this service.
    ///
    /// The socket holds only a weak reference, so dropping the service
    /// silences the handler. The returned handle can be passed to
    /// [`SocketClient::remove_handler`].
    pub fn attach(self: &Arc<Self>, socket: &SocketClient) -> MessageHandler {
        let service: Weak<Self> = Arc::downgrade(self);
        let handler: MessageHandler = Arc::new(move |frame: &IncomingFrame| {
            if let Some(service) = service.upgrade() {
                service.handle_incoming(frame);
            }
        });
        socket.on_message(Arc::clone(&handler));
        handler
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;
