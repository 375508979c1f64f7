//! Observer registration and subscription lifetime management.
//!
//! # Responsibility
//! - Keep registered observers in registration order for fan-out.
//! - Tie subscription lifetime to an owned handle (unsubscribe on drop).
//!
//! # Invariants
//! - `notify_all` invokes every observer exactly once, in registration
//!   order.
//! - A handle sends at most one unsubscribe command over its lifetime.

use super::worker::Command;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

/// Identifier of one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-argument change callback, invoked on the worker thread.
pub(crate) type ObserverFn = Box<dyn Fn() + Send>;

/// Registration-ordered observer set, owned by the store worker.
pub(crate) struct ObserverRegistry {
    entries: Vec<(SubscriptionId, ObserverFn)>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, id: SubscriptionId, observer: ObserverFn) {
        self.entries.push((id, observer));
    }

    /// Removes one observer; returns whether it was registered.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Invokes every observer once, in registration order.
    pub(crate) fn notify_all(&self) {
        for (_, observer) in &self.entries {
            observer();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Owned subscription lifetime.
///
/// Dropping the handle unsubscribes the observer. Call
/// [`SubscriptionHandle::detach`] to keep the observer registered for the
/// remaining life of the store without holding the handle.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    commands: Sender<Command>,
    active: bool,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, commands: Sender<Command>) -> Self {
        Self {
            id,
            commands,
            active: true,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops delivery to this observer.
    ///
    /// Notifications already queued ahead of the unsubscribe command are
    /// still delivered.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the observer registered for the remaining life of the store
    /// and discards the handle.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            // Worker may already be gone; nothing left to unsubscribe from.
            let _ = self.commands.send(Command::Unsubscribe { id: self.id });
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::{ObserverRegistry, SubscriptionId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn notifies_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        for tag in 0..3u64 {
            let order = Arc::clone(&order);
            registry.register(
                SubscriptionId(tag),
                Box::new(move || order.lock().unwrap().push(tag)),
            );
        }

        registry.notify_all();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn removed_observer_is_not_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ObserverRegistry::new();
        let counted = Arc::clone(&calls);
        registry.register(
            SubscriptionId(1),
            Box::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(registry.remove(SubscriptionId(1)));
        assert!(!registry.remove(SubscriptionId(1)));
        registry.notify_all();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 0);
    }
}
