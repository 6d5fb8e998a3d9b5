//! Order status notifications shared between views.

use tokio::sync::broadcast;

use dronetrack_core::models::StatusChange;

const BUS_CAPACITY: usize = 64;

/// One-way pub/sub channel for `order:statusChanged` events.
///
/// Publishing is fire-and-forget. Each receiver reconciles its own copy of
/// the order from the payload.
pub trait StatusNotifier: Send + Sync {
    fn publish(&self, change: StatusChange);

    fn subscribe(&self) -> broadcast::Receiver<StatusChange>;
}

/// Process-local notifier backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct LocalStatusBus {
    tx: broadcast::Sender<StatusChange>,
}

impl Default for LocalStatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStatusBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }
}

impl StatusNotifier for LocalStatusBus {
    fn publish(&self, change: StatusChange) {
        tracing::debug!(order_id = %change.id, status = %change.status, "publishing status change");
        // Nobody listening is fine.
        let _ = self.tx.send(change);
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.tx.subscribe()
    }
}
