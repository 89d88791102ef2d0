//! Chat dispatch between the socket client and UI-facing callbacks.

pub mod offline;
pub mod service;
