//! Listener registry for the realtime client.
//!
//! Listeners are keyed by channel. Dispatch snapshots the matching
//! listeners and releases the lock before invoking them, so a listener may
//! register, unregister, or disconnect the client from inside its callback.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, ListenerId};
use crate::domain::realtime::{ListenerChannel, TransportMessage};

/// Receives realtime messages.
///
/// Errors and panics are caught and logged by the dispatcher; they never
/// reach the transport or other listeners.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, message: &TransportMessage) -> Result<(), DomainError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> MessageListener for F
where
    F: Fn(&TransportMessage) + Send + Sync,
{
    fn on_message(&self, message: &TransportMessage) -> Result<(), DomainError> {
        self(message);
        Ok(())
    }
}

type Registered = (ListenerId, Arc<dyn MessageListener>);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    channels: Mutex<HashMap<ListenerChannel, Vec<Registered>>>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<ListenerChannel, Vec<Registered>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn add(&self, channel: ListenerChannel, listener: Arc<dyn MessageListener>) -> ListenerId {
        let id = ListenerId::new();
        self.lock().entry(channel).or_default().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, channel: &ListenerChannel, id: ListenerId) -> bool {
        let mut channels = self.lock();
        let Some(listeners) = channels.get_mut(channel) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            channels.remove(channel);
        }
        removed
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.lock()
            .values()
            .any(|listeners| listeners.iter().any(|(registered, _)| *registered == id))
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Delivers `message` to the listeners of its type, then to `All`.
    pub(crate) fn dispatch(&self, message: &TransportMessage) {
        let targets: Vec<Arc<dyn MessageListener>> = {
            let channels = self.lock();
            let typed = channels.get(&ListenerChannel::Type(message.message_type.clone()));
            let all = channels.get(&ListenerChannel::All);
            typed
                .into_iter()
                .chain(all)
                .flatten()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in targets {
            match catch_unwind(AssertUnwindSafe(|| listener.on_message(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(
                        listener = listener.name(),
                        message_type = %message.message_type,
                        error = %e,
                        "Realtime listener failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        listener = listener.name(),
                        message_type = %message.message_type,
                        "Realtime listener panicked"
                    );
                }
            }
        }
    }
}
