//! Cooperative cancellation for blocking reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag that another thread can raise to abort in-progress reads.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Reads observe it before their next blocking call.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused for a retry.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
