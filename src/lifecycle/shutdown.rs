//! Stop signal fanned out to the proxy server and its helpers.
//!
//! The signal task holds a clone and calls [`Shutdown::trigger`]; `HttpServer::run`
//! holds a receiver and starts draining exchanges when it fires.

use tokio::sync::broadcast;

/// One-shot stop broadcast. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver that resolves once [`trigger`](Self::trigger) is called.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every receiver to stop. Harmless when none are left.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Receivers still alive, i.e. tasks that have not wound down yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
