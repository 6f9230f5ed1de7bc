//! Destructive abandon signal for blocked naive transfers
//!
//! Rust threads cannot be killed from outside. The deadlock phase instead
//! raises an `AbandonSignal`, which the naive transfer checks only while it is
//! waiting for a lock. A worker that sees the signal drops whatever guard it
//! holds and returns without finishing its transfer.
//!
//! This is not a graceful shutdown: the transfer is discarded, not completed
//! or rolled back. It is safe only because the naive transfer waits for both
//! locks strictly before it mutates anything. The ordered transfer never
//! looks at this signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared one-way flag telling blocked naive workers to give up
#[derive(Debug, Clone, Default)]
pub struct AbandonSignal {
    raised: Arc<AtomicBool>,
}

impl AbandonSignal {
    /// Create a lowered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell every worker sharing this signal to abandon its wait
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Whether the signal has been raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_shared_between_clones() {
        let signal = AbandonSignal::new();
        let observer = signal.clone();

        assert!(!observer.is_raised());
        signal.raise();
        assert!(observer.is_raised());
    }
}
