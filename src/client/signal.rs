//! Fire-once completion signal shared by the receiver and the lifecycle loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Single-fire, payload-free broadcast.
///
/// Any clone may fire it; only the first call to [`fire`](Self::fire)
/// returns `true`. Any number of clones may wait on
/// [`fired`](Self::fired).
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CompletionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` for the caller that fired it first.
    pub fn fire(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::AcqRel);
        if first {
            self.token.cancel();
        }
        first
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal has fired.
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }

    /// Guard that fires the signal when dropped.
    #[must_use]
    pub fn fire_on_drop(&self) -> FireGuard {
        FireGuard {
            signal: self.clone(),
        }
    }
}

/// Fires its [`CompletionSignal`] on drop, including during unwinding.
#[derive(Debug)]
pub struct FireGuard {
    signal: CompletionSignal,
}

impl Drop for FireGuard {
    fn drop(&mut self) {
        self.signal.fire();
    }
}
