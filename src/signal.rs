//! Minimal multicast change notification.
//!
//! A [`Signal`] is a payload-free "something changed, re-resolve" pulse. It is
//! hot (exists without subscribers), multicast (0..N subscribers) and never
//! completes. Subscribing returns a [`Subscription`] handle that unsubscribes
//! when dropped.
//!
//! [`emit`](Signal::emit) snapshots the subscriber list and releases the lock
//! before calling anything, so callbacks run on the emitting thread and may
//! freely subscribe, unsubscribe or emit again. A callback removed while an
//! emission is in flight can still receive that one emission.
//!
//! Merging many signals into one stream is done by subscribing the same
//! callback to each of them and combining the handles with
//! [`Subscription::merge`]; see
//! [`ConfigDefinition::subscribe`](crate::ConfigDefinition::subscribe).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Shared callback invoked on every emission.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, ChangeCallback)>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run on every future emission.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_callback(Arc::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe) for an already shared callback, so
    /// one closure can be attached to several signals.
    pub fn subscribe_callback(&self, callback: ChangeCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, callback));
        Subscription {
            entries: vec![(Arc::downgrade(&self.inner), id)],
        }
    }

    /// Notify every current subscriber once, in subscription order.
    pub fn emit(&self) {
        let snapshot: Vec<ChangeCallback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Whether both handles refer to the same underlying signal.
    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to one or more signal registrations. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Default)]
pub struct Subscription {
    entries: Vec<(Weak<SignalInner>, u64)>,
}

impl Subscription {
    /// A handle that is subscribed to nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Combine several handles into one that owns all their registrations.
    pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let mut entries = Vec::new();
        for mut sub in subscriptions {
            entries.append(&mut sub.entries);
        }
        Self { entries }
    }

    /// Number of signal registrations held by this handle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep the registrations alive for as long as their signals live.
    pub fn detach(mut self) {
        self.entries.clear();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for (signal, id) in self.entries.drain(..) {
            let Some(inner) = signal.upgrade() else {
                continue;
            };
            // A removed callback may own another subscription on this
            // signal, so it is dropped only after the lock is released.
            let removed = {
                let mut subscribers = inner.subscribers.lock();
                subscribers
                    .iter()
                    .position(|(sub_id, _)| *sub_id == id)
                    .map(|index| subscribers.remove(index))
            };
            drop(removed);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("registrations", &self.entries.len())
            .finish()
    }
}
