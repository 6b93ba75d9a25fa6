//! Broker add/remove observers
//!
//! Observers are notified synchronously on the thread that changed the
//! registry. Every notification pass iterates a snapshot of the observer list,
//! so subscribing or unsubscribing during a pass never disturbs it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::connection::{same_object, SharedConnection};

/// Interested in connections being added to or removed from the registry
pub trait BrokersObserver: Send + Sync {
    fn broker_added(&self, connection: &SharedConnection);

    fn broker_removed(&self, connection: &SharedConnection);
}

/// Ordered list of observers with snapshot fan-out
///
/// Registration order is notification order. Registering the same observer
/// twice notifies it twice.
#[derive(Default)]
pub struct ObserverHub {
    observers: RwLock<Vec<Arc<dyn BrokersObserver>>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn BrokersObserver>) {
        self.observers.write().push(observer);
    }

    /// Remove the first registration of `observer`
    ///
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&self, observer: &Arc<dyn BrokersObserver>) -> bool {
        let mut observers = self.observers.write();
        match observers.iter().position(|o| same_object(o, observer)) {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_subscribers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_subscribers()
    }

    pub fn notify_added(&self, connection: &SharedConnection) {
        self.notify("broker_added", connection, |observer| {
            observer.broker_added(connection)
        });
    }

    pub fn notify_removed(&self, connection: &SharedConnection) {
        self.notify("broker_removed", connection, |observer| {
            observer.broker_removed(connection)
        });
    }

    fn snapshot(&self) -> Vec<Arc<dyn BrokersObserver>> {
        self.observers.read().clone()
    }

    /// Deliver one event to every observer in the snapshot
    ///
    /// A panicking observer is logged and skipped; the remaining observers
    /// still receive the event.
    fn notify<F>(&self, event: &'static str, connection: &SharedConnection, deliver: F)
    where
        F: Fn(&dyn BrokersObserver),
    {
        for observer in self.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| deliver(observer.as_ref())));
            if outcome.is_err() {
                tracing::error!(
                    broker = connection.name(),
                    event,
                    "Brokers observer panicked; continuing with remaining observers"
                );
            }
        }
    }
}

impl std::fmt::Debug for ObserverHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHub")
            .field("observer_count", &self.len())
            .finish()
    }
}
