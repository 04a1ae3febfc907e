//! Counted guard that silences the crash reconciler around intentional
//! terminations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;

/// Tracks outstanding suppress tokens.
#[derive(Debug, Default)]
pub struct ReconcileSuppression {
    holders: AtomicUsize,
}

impl ReconcileSuppression {
    /// Builds a released flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag until the returned guard is dropped and `settle` has
    /// elapsed afterwards.
    #[must_use]
    pub fn hold(self: &Arc<Self>, settle: Duration) -> SuppressGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        SuppressGuard {
            flag: Arc::clone(self),
            settle,
        }
    }

    /// Whether any token or settle delay is outstanding.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }

    fn release(&self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Token keeping the suppress flag set.
#[derive(Debug)]
pub struct SuppressGuard {
    flag: Arc<ReconcileSuppression>,
    settle: Duration,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        let flag = Arc::clone(&self.flag);
        match Handle::try_current() {
            Ok(handle) if !self.settle.is_zero() => {
                let settle = self.settle;
                handle.spawn(async move {
                    tokio::time::sleep(settle).await;
                    flag.release();
                });
            }
            _ => flag.release(),
        }
    }
}
