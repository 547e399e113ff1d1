//! Cooperative cancellation.
//!
//! The checker polls the token between statements and scopes; it never
//! preempts. A cancelled pass discards its diagnostic sink and returns,
//! leaving the type cache intact (cache writes are idempotent value
//! writes, safe to abandon).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one analysis host.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request cancellation of in-flight passes.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Poll the flag.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Reset for the next pass.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}
