//! In-memory transport whose open attempts follow a script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::SinkExt;
use futures::channel::mpsc as pipe;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::transport::{Connection, Transport, TransportError};

/// What the next `open` call does. Unscripted opens are refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Refuse,
    Accept,
}

/// One recorded `open` call.
#[derive(Clone, Debug)]
pub(crate) struct OpenAttempt {
    pub(crate) url: String,
    pub(crate) at: Instant,
}

/// Server side of an accepted connection.
pub(crate) struct Peer {
    to_client: pipe::UnboundedSender<Result<String, TransportError>>,
    from_client: pipe::UnboundedReceiver<String>,
}

impl Peer {
    pub(crate) fn push(&self, text: &str) {
        let _ = self.to_client.unbounded_send(Ok(text.to_owned()));
    }

    pub(crate) fn fail(&self) {
        let _ = self
            .to_client
            .unbounded_send(Err(TransportError::Io("connection reset".into())));
    }

    /// Ends the inbound stream as a clean close.
    pub(crate) fn close(self) {
        drop(self);
    }

    /// Frames the client has written so far.
    pub(crate) fn sent(&mut self) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(text) = self.from_client.try_recv() {
            sent.push(text);
        }
        sent
    }
}

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Outcome>,
    peers: VecDeque<Peer>,
}

#[derive(Clone)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    opens: mpsc::UnboundedSender<OpenAttempt>,
}

impl ScriptedTransport {
    /// Returns the transport plus a feed of every open attempt.
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<OpenAttempt>) {
        let (opens, rx) = mpsc::unbounded_channel();
        let transport = Self {
            script: Arc::new(Mutex::new(Script::default())),
            opens,
        };
        (transport, rx)
    }

    pub(crate) fn script(&self, outcomes: &[Outcome]) {
        let mut script = self.script.lock().expect("script mutex should lock");
        script.outcomes.extend(outcomes.iter().copied());
    }

    /// Oldest accepted connection not yet taken by the test.
    pub(crate) fn take_peer(&self) -> Peer {
        let mut script = self.script.lock().expect("script mutex should lock");
        script.peers.pop_front().expect("an accepted connection")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &str) -> Result<Connection, TransportError> {
        let _ = self.opens.send(OpenAttempt {
            url: url.to_owned(),
            at: Instant::now(),
        });

        let mut script = self.script.lock().expect("script mutex should lock");
        match script.outcomes.pop_front().unwrap_or(Outcome::Refuse) {
            Outcome::Refuse => Err(TransportError::Connect("connection refused".into())),
            Outcome::Accept => {
                let (to_client, inbound) = pipe::unbounded();
                let (outbound, from_client) = pipe::unbounded::<String>();
                script.peers.push_back(Peer {
                    to_client,
                    from_client,
                });
                Ok(Connection {
                    outbound: Box::pin(outbound.sink_map_err(|_| TransportError::Closed)),
                    inbound: Box::pin(inbound),
                })
            }
        }
    }
}
