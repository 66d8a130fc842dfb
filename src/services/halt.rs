//! Cooperative halt signalling.
//!
//! A watch channel rather than a polled flag, so backoff waits and the
//! dispatch loop can `select!` on the signal and observe it at the finest
//! schedulable granularity.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared halt signal checked between every task dispatch.
///
/// Halting is cooperative: in-flight executor calls run to completion,
/// but no new task is dispatched once the signal is observed.
#[derive(Debug, Clone)]
pub struct HaltSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for HaltSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl HaltSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request a halt. Returns immediately; the running loop observes the
    /// signal at its next suspension point.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Clear the signal (resume / rollback / reset).
    pub fn clear(&self) {
        let _ = self.tx.send(false);
    }

    /// Non-blocking check.
    pub fn is_halted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is raised. Used in `select!` arms to cut
    /// backoff waits short.
    pub async fn halted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|halted| *halted).await.is_err() {
            // Sender dropped while cleared: a halt can no longer arrive.
            std::future::pending::<()>().await;
        }
    }
}
