//! Registry change notifications for the dashboard.

use tokio::sync::broadcast;

/// Told about every registry change with a fresh textual rendering.
///
/// Called on the registration path, so implementations must not block.
pub trait RegistryObserver: Send + Sync {
    fn on_registry_changed(&self, table: &str);
}

/// Observer that discards notifications.
pub struct NoopObserver;

impl RegistryObserver for NoopObserver {
    fn on_registry_changed(&self, _table: &str) {}
}

/// Fans registry renderings out to any number of dashboard subscribers.
///
/// Slow subscribers lag and lose old renderings; the sender never waits.
#[derive(Clone)]
pub struct DashboardFeed {
    tx: broadcast::Sender<String>,
}

impl DashboardFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl RegistryObserver for DashboardFeed {
    fn on_registry_changed(&self, table: &str) {
        // No subscribers is not an error.
        let _ = self.tx.send(table.to_owned());
    }
}
