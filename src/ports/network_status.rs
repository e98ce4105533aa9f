//! NetworkStatus port - connectivity signal from the host platform.

use tokio::sync::watch;

pub trait NetworkStatus: Send + Sync {
    fn is_online(&self) -> bool;

    /// A receiver that observes every online/offline change.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
