//! Native client core for HiveMind Studio.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net` owns every connection to the backend, `chat` turns chat traffic into
//! callbacks and offline replies, and `config` loads both from the
//! environment. Message and record models come from the `transcript`,
//! `records` and `frames` crates.

pub mod chat;
pub mod config;
pub mod net;

pub use chat::service::{ChatEvents, ChatService, FrameSink};
pub use config::{ReconnectConfig, StudioConfig};
pub use net::api::{ApiClient, ApiError, Feed};
pub use net::socket::{ConnectionStatus, SessionSnapshot, SocketClient};
