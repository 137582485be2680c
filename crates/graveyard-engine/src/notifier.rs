//! Notifier seam — where ledger events leave the core
//!
//! The core never waits on delivery. `BroadcastNotifier` hands events to a
//! tokio broadcast channel; a transport layer subscribes and fans them out.

use graveyard_core::LedgerEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Receives every event the engines emit. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: LedgerEvent);
}

/// Fan-out over a broadcast channel. Events sent with no subscribers are dropped.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<LedgerEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: LedgerEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(n) => trace!("Delivered {} to {} subscribers", kind, n),
            Err(_) => trace!("Dropped {}: no subscribers", kind),
        }
    }
}

/// Discards everything.
#[derive(Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: LedgerEvent) {}
}
