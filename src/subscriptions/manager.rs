//! Subscription manager for broadcasting collection snapshots.

use crate::records::Entity;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{
    DropReason, Snapshot, SnapshotEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription<E> {
    sender: Sender<SnapshotEvent<E>>,
}

impl<E> Subscription<E> {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone.
    fn try_send(&self, event: SnapshotEvent<E>) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Shared registry; handles keep a weak reference to it.
pub(crate) struct Registry<E> {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription<E>>>,
    next_id: AtomicU64,
}

impl<E: Entity> Registry<E> {
    pub(crate) fn remove(&self, id: SubscriptionId, reason: DropReason) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            debug!(collection = E::COLLECTION, id = id.0, ?reason, "subscription released");
            // Best effort: the receiver may already be gone.
            let _ = sub.sender.try_send(SnapshotEvent::Dropped { reason });
        }
    }
}

/// Manages the standing subscriptions of one collection.
pub struct SubscriptionManager<E> {
    registry: Arc<Registry<E>>,
}

impl<E: Entity> SubscriptionManager<E> {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscriptions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a subscriber and deliver `current` to it immediately.
    pub fn subscribe(&self, config: &SubscriptionConfig, current: Snapshot<E>) -> SubscriptionHandle<E> {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let subscription = Subscription { sender };
        // Fresh channel with capacity >= 1: the initial delivery always fits.
        subscription.try_send(SnapshotEvent::Snapshot(current));

        self.registry.subscriptions.write().insert(id, subscription);
        debug!(collection = E::COLLECTION, id = id.0, "subscription opened");

        SubscriptionHandle::new(id, receiver, Arc::downgrade(&self.registry))
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.remove(id, DropReason::Unsubscribed);
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.registry.subscriptions.read().len()
    }

    /// Deliver a snapshot to every subscriber. Drops subscribers that fail to
    /// receive.
    pub fn broadcast(&self, snapshot: &Snapshot<E>) {
        let mut to_remove = Vec::new();

        {
            let subs = self.registry.subscriptions.read();
            for (id, sub) in subs.iter() {
                if !sub.try_send(SnapshotEvent::Snapshot(snapshot.clone())) {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        for id in to_remove {
            warn!(collection = E::COLLECTION, id = id.0, "dropping slow subscriber");
            self.registry.remove(id, DropReason::BufferOverflow);
        }
    }
}

impl<E: Entity> Default for SubscriptionManager<E> {
    fn default() -> Self {
        Self::new()
    }
}
