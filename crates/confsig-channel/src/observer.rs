//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::ticket::ReconnectionTicket;

/// Listener for channel lifecycle events.
///
/// Callbacks run on whichever thread drove the lifecycle change (often the
/// transport's I/O thread) and must not call back into mutating channel
/// operations.
pub trait ChannelObserver: Send + Sync {
    /// The server side ended the session and reconnection gave up.
    fn on_server_disconnected(&self) {}
    /// A new reconnection ticket was installed.
    fn on_reconnection_ticket(&self, _ticket: &ReconnectionTicket) {}
    /// The session was closed locally through `disconnect`.
    fn on_session_closed(&self) {}
    /// The server pushed an unsolicited event.
    fn on_server_notification(&self, _event: &str, _payload: &JsonValue) {}
}

/// Registration handle returned by [`ObserverRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

/// Observers held by weak reference, notified in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    next_handle: AtomicU64,
    observers: RwLock<Vec<(ObserverHandle, Weak<dyn ChannelObserver>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: &Arc<dyn ChannelObserver>) -> ObserverHandle {
        let handle = ObserverHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .push((handle, Arc::downgrade(observer)));
        handle
    }

    /// Returns `false` if the handle was not registered.
    pub fn remove(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != handle);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `notify` on every live observer. Dead entries are pruned.
    pub fn notify(&self, notify: impl Fn(&dyn ChannelObserver)) {
        let (live, has_dead) = {
            let observers = self.observers.read();
            let live: Vec<Arc<dyn ChannelObserver>> =
                observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect();
            let has_dead = live.len() != observers.len();
            (live, has_dead)
        };
        if has_dead {
            self.observers
                .write()
                .retain(|(_, weak)| weak.strong_count() > 0);
        }
        for observer in live {
            notify(observer.as_ref());
        }
    }
}
