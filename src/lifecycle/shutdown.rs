//! Process-wide stop signal.

use tokio::sync::broadcast;

/// Fans a single stop notification out to the HTTP server and the
/// maintenance task.
///
/// Each task takes its own receiver before it starts; a receiver created
/// after [`Shutdown::trigger`] never sees the signal.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every current receiver. Safe to call with none attached.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Receivers not yet dropped, i.e. tasks that have not finished draining.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
