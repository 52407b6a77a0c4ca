//! Typed notification channel
//!
//! Components communicate status to the outside world through fire-and-forget
//! messages on a broadcast channel. Any number of consumers may subscribe;
//! sending with no subscribers is not an error.

mod messages;

pub use messages::{Notification, SessionState};

use tokio::sync::broadcast;

/// Handle for publishing notifications and creating subscriptions.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all notifications published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish a notification. Best-effort: an absent listener is fine.
    pub fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
