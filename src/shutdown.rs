//! Cooperative shutdown signal.
//!
//! A watch channel flipped once by the signal handler. Every sleep and poll
//! in the engine selects against it, so the process stops between steps
//! instead of only at run boundaries.

use std::time::Duration;
use tokio::sync::watch;

/// Create a linked (trigger, listener) pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half, held by the signal handler.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half, cloned into every component that waits.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested. A dropped trigger counts as a
    /// shutdown request so orphaned tasks cannot wait forever.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep for `dur`. Returns false if shutdown interrupted the wait.
    pub async fn sleep(&mut self, dur: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(dur) => true,
            _ = self.cancelled() => false,
        }
    }
}
