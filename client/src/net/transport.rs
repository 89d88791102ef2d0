//! Transport seam between socket consumers and the network.
//!
//! A [`Transport`] opens one text-message connection per call. The socket
//! driver and the log/deployment feeds only see [`Connection`] halves, so tests
//! can substitute an in-memory transport for [`WsTransport`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(BoxError),
    #[error("transport failed: {0}")]
    Io(BoxError),
    #[error("connection closed")]
    Closed,
}

pub type OutboundSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type InboundStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Both directions of an open connection.
///
/// The inbound stream ends (or yields [`TransportError::Closed`]) when the
/// peer closes; any other error means the connection is unusable.
pub struct Connection {
    pub outbound: OutboundSink,
    pub inbound: InboundStream,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection to `url`.
    async fn open(&self, url: &str) -> Result<Connection, TransportError>;
}

/// Websocket transport over `tokio-tungstenite` with rustls.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<Connection, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|error| TransportError::Connect(Box::new(error)))?;
        let (write, read) = stream.split();

        let outbound = write
            .sink_map_err(|error| TransportError::Io(Box::new(error)))
            .with(|text: String| async move { Ok::<_, TransportError>(Message::Text(text.into())) });

        let inbound = read.filter_map(|message| async move { inbound_text(message) });

        Ok(Connection {
            outbound: Box::pin(outbound),
            inbound: Box::pin(inbound),
        })
    }
}

/// Map one websocket message to inbound text.
///
/// Binary frames are accepted only when they hold valid UTF-8; anything else
/// is dropped here so it never reaches frame decoding. Control frames other
/// than close yield nothing.
fn inbound_text(message: Result<Message, tungstenite::Error>) -> Option<Result<String, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(Ok(text)),
            Err(error) => {
                debug!(error = %error, "dropping binary frame that is not UTF-8");
                None
            }
        },
        Ok(Message::Close(_)) => Some(Err(TransportError::Closed)),
        Ok(_) => None,
        Err(error) => Some(Err(TransportError::Io(Box::new(error)))),
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;
