//! Subscription types for live collection snapshots.

use crate::records::Entity;
use crate::types::Sequence;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use super::manager::Registry;

/// Configuration for a subscription.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Max undelivered snapshots before the subscriber is dropped.
    /// Default: 64
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer_size: 64 }
    }
}

/// The complete, ordered contents of a collection at one store version.
///
/// Items are ordered newest first by store-assigned sequence.
#[derive(Debug)]
pub struct Snapshot<E> {
    /// Store version this snapshot was taken at.
    pub version: Sequence,
    pub items: Arc<[E]>,
}

impl<E> Clone for Snapshot<E> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: Arc::clone(&self.items),
        }
    }
}

impl<E> Snapshot<E> {
    pub fn new(version: Sequence, items: Vec<E>) -> Self {
        Self {
            version,
            items: items.into(),
        }
    }

    /// Snapshot of a collection nothing has been written to yet.
    pub fn empty() -> Self {
        Self::new(Sequence::default(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }
}

impl<E: Entity> Snapshot<E> {
    /// Look up a record by id.
    pub fn get(&self, id: &crate::types::DocumentId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }
}

/// Events delivered to a subscriber.
#[derive(Debug)]
pub enum SnapshotEvent<E> {
    /// The collection changed; here is all of it.
    Snapshot(Snapshot<E>),

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

impl<E> Clone for SnapshotEvent<E> {
    fn clone(&self) -> Self {
        match self {
            SnapshotEvent::Snapshot(s) => SnapshotEvent::Snapshot(s.clone()),
            SnapshotEvent::Dropped { reason } => SnapshotEvent::Dropped {
                reason: reason.clone(),
            },
        }
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Owned handle to a standing subscription.
///
/// Dropping the handle releases the subscription; no deliveries happen after
/// that.
pub struct SubscriptionHandle<E: Entity> {
    pub id: SubscriptionId,
    receiver: crossbeam_channel::Receiver<SnapshotEvent<E>>,
    registry: Weak<Registry<E>>,
}

impl<E: Entity> SubscriptionHandle<E> {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: crossbeam_channel::Receiver<SnapshotEvent<E>>,
        registry: Weak<Registry<E>>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<SnapshotEvent<E>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<SnapshotEvent<E>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SnapshotEvent<E>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Release the subscription now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl<E: Entity> Drop for SubscriptionHandle<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id, DropReason::Unsubscribed);
        }
    }
}

impl<E: Entity> std::fmt::Debug for SubscriptionHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("collection", &E::COLLECTION)
            .finish()
    }
}
