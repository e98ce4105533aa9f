//! Network status adapter backed by a `watch` channel.
//!
//! The host (or a test) flips the flag with [`WatchNetworkStatus::set_online`];
//! every subscriber sees the change.

use std::sync::Arc;
use tokio::sync::watch;

use crate::ports::NetworkStatus;

#[derive(Debug, Clone)]
pub struct WatchNetworkStatus {
    tx: Arc<watch::Sender<bool>>,
}

impl WatchNetworkStatus {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// A status that is always online (headless daemon).
    pub fn always_online() -> Self {
        Self::new(true)
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl Default for WatchNetworkStatus {
    fn default() -> Self {
        Self::always_online()
    }
}

impl NetworkStatus for WatchNetworkStatus {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let status = WatchNetworkStatus::new(true);
        let mut rx = status.subscribe();

        status.set_online(false);
        rx.changed().await.unwrap();

        assert!(!*rx.borrow());
        assert!(!status.is_online());
    }

    #[tokio::test]
    async fn repeated_value_does_not_notify() {
        let status = WatchNetworkStatus::new(true);
        let mut rx = status.subscribe();

        status.set_online(true);

        assert!(!rx.has_changed().unwrap());
    }
}
