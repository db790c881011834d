//! Change notifier backed by a tokio broadcast channel.
//!
//! Notifications are only emitted by the engine worker, so every subscriber
//! sees them in the order the mutations were applied.

use serde::Serialize;
use tokio::sync::broadcast;

use lightsync_domain::change::ListDiff;
use lightsync_domain::device::DeviceRecord;

/// What observers of the device list receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Minimal changes since the previous notification.
    Changed { diff: ListDiff },
    /// Full list, sent only after an explicit reload from the store.
    Reset { devices: Vec<DeviceRecord> },
    /// A message on one of the global channels, outside the per-device scheme.
    Channel { topic: String, payload: String },
    /// The message bus connected or disconnected.
    Connection { connected: bool },
}

/// Fan-out of [`Notification`]s to any number of observers.
///
/// Sending succeeds even when there are no active subscribers (the
/// notification is simply dropped). A torn-down observer just stops
/// receiving.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Notification>,
}

impl ChangeNotifier {
    /// Create a notifier with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications emitted *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Emit a diff, unless it is empty.
    pub fn changed(&self, diff: ListDiff) {
        if diff.is_empty() {
            return;
        }
        self.emit(Notification::Changed { diff });
    }

    pub fn reset(&self, devices: Vec<DeviceRecord>) {
        self.emit(Notification::Reset { devices });
    }

    pub fn channel(&self, topic: &str, payload: &str) {
        self.emit(Notification::Channel {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
    }

    pub fn connection(&self, connected: bool) {
        self.emit(Notification::Connection { connected });
    }

    fn emit(&self, notification: Notification) {
        // broadcast::send fails only when there are zero receivers.
        let _ = self.sender.send(notification);
    }
}
