//! Networking for the studio backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `socket` keeps the chat connection alive and fans out decoded frames,
//! `api` handles REST calls and one-shot live feeds, and `transport` is the
//! seam both use to open websocket connections.

pub mod api;
#[cfg(test)]
pub(crate) mod scripted;
pub mod socket;
pub mod transport;
