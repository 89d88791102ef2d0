//! Interactive chat loop.
//!
//! DESIGN
//! ======
//! The terminal owns the transcript. `TerminalView` receives dispatcher
//! callbacks on the socket task, folds them into the transcript and prints.
//! Input lines are read on the main task; anything starting with `/` is a
//! local command.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use client::{ChatEvents, ChatService, SocketClient, StudioConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use transcript::{ChatMessage, MessageIdGen, Role, Transcript, now_ms};

use crate::CliError;
use crate::render::{speaker, status_line};

/// One parsed line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Quit,
    Help,
    Status,
    SwitchAgent(String),
    Message(String),
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_owned());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit"), _) => Input::Quit,
        (Some("help"), _) => Input::Help,
        (Some("status"), _) => Input::Status,
        (Some("agent"), Some(agent_id)) => Input::SwitchAgent(agent_id.to_owned()),
        _ => Input::Unknown(line.to_owned()),
    }
}

const HELP: &str = "\
/agent <id>   address another agent
/status       show connection state
/help         show this list
/quit, /exit  leave the chat";

// =============================================================================
// VIEW
// =============================================================================

/// Transcript plus terminal echo for every dispatcher callback.
pub struct TerminalView {
    transcript: Mutex<Transcript>,
    errors: MessageIdGen,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            transcript: Mutex::new(Transcript::new()),
            errors: MessageIdGen::new("err"),
        }
    }

    /// Record a user turn and return the history to send with it.
    pub fn push_user(&self, message: ChatMessage) -> Vec<ChatMessage> {
        let mut transcript = self.lock();
        transcript.push(message);
        transcript.context().to_vec()
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.lock().messages().to_vec()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatEvents for TerminalView {
    fn on_response(&self, message: ChatMessage) {
        println!("{}> {}", speaker(&message), message.content);
        self.lock().push_response(message);
    }

    fn on_stream_start(&self, message_id: &str, agent_id: &str) {
        if self.lock().start_stream(message_id, agent_id, now_ms()) {
            print!("{}> ", records::agent_display_name(agent_id));
            let _ = std::io::stdout().flush();
        }
    }

    fn on_stream_chunk(&self, message_id: &str, content: &str) {
        if self.lock().append_chunk(message_id, content) {
            print!("{content}");
            let _ = std::io::stdout().flush();
        }
    }

    fn on_stream_end(&self, message_id: &str, _agent_id: &str) {
        if self.lock().end_stream(message_id) {
            println!();
        }
    }

    fn on_error(&self, message: &str) {
        let mut transcript = self.lock();
        if transcript.streaming_id().is_some() {
            println!();
        }
        eprintln!("error: {message}");
        let now = now_ms();
        transcript.push_error(self.errors.next_id(now), message, now);
    }

    fn on_agent_switched(&self, agent_id: &str, agent_name: &str) {
        println!("-- now talking to {agent_name} ({agent_id})");
    }

    fn on_auth_status(&self, ok: bool, message: &str) {
        if ok {
            println!("-- credentials accepted: {message}");
        } else {
            eprintln!("credentials rejected: {message}");
        }
    }
}

// =============================================================================
// LOOP
// =============================================================================

pub async fn run_chat(config: &StudioConfig) -> Result<(), CliError> {
    let socket = SocketClient::connect(config.chat_url.clone(), config.reconnect);
    let view = Arc::new(TerminalView::new());
    let service = Arc::new(ChatService::new(socket.clone(), view.clone()));
    service.set_active_agent(&config.agent_id);
    service.set_auth_config(config.auth.clone());
    let _handler = service.attach(&socket);

    let watcher = tokio::spawn(report_status(socket.clone()));
    info!(url = %config.chat_url, agent = %config.agent_id, "chat session started");
    eprintln!("talking to {}; /help for commands", config.agent_id);

    let user_ids = MessageIdGen::new("user");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => eprintln!("{HELP}"),
            Input::Status => eprintln!("{}", status_line(&socket.snapshot())),
            Input::SwitchAgent(agent_id) => {
                service.switch_agent(&agent_id);
                if !socket.is_connected() {
                    eprintln!("-- now talking to {agent_id} (offline)");
                }
            }
            Input::Unknown(command) => eprintln!("unknown command: {command}"),
            Input::Message(content) => {
                let now = now_ms();
                let turn = ChatMessage::new(user_ids.next_id(now), Role::User, content.clone(), now);
                let history = view.push_user(turn);
                service.send_message(&content, &history);
            }
        }
    }

    socket.disconnect();
    watcher.abort();
    info!(
        messages = view.snapshot().len(),
        sent = user_ids.issued(),
        "chat session ended"
    );
    Ok(())
}

/// Print each connection status change to stderr.
async fn report_status(socket: SocketClient) {
    let mut state = socket.subscribe();
    let mut last = state.borrow().status;
    while state.changed().await.is_ok() {
        let snapshot = state.borrow_and_update().clone();
        if snapshot.status != last {
            last = snapshot.status;
            eprintln!("-- {}", status_line(&snapshot));
        }
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;
