//! Per-session message id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates `{prefix}-{timestamp}-{counter}` ids.
///
/// The counter belongs to the generator, not the process, so two sessions
/// never share a sequence. Uniqueness holds within one generator.
#[derive(Debug)]
pub struct MessageIdGen {
    prefix: String,
    counter: AtomicU64,
}

impl MessageIdGen {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Next id, stamped with the caller's notion of "now".
    pub fn next_id(&self, now_ms: i64) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{now_ms}-{n}", self.prefix)
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for MessageIdGen {
    fn default() -> Self {
        Self::new("msg")
    }
}
