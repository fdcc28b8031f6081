//! Local materialization of a live collection.
//!
//! A [`LiveCollection`] owns one standing subscription and the newest snapshot
//! it has received. Deliveries replace the materialization wholesale; older
//! store versions are ignored. If the store drops the subscription (a viewer
//! that fell a full buffer behind) the collection subscribes again on its next
//! `pump`/`wait` and catches up from the fresh initial snapshot. Closing or
//! dropping the collection releases the subscription.

use crate::error::StoreError;
use crate::filter::{self, FilterCriteria, Filterable};
use crate::records::Entity;
use crate::store::DocumentCollection;
use crate::subscriptions::{DropReason, Snapshot, SnapshotEvent, SubscriptionHandle};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection state of a live collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveState {
    /// Receiving deliveries.
    Live,
    /// The store dropped the subscription and it could not be reopened yet.
    Dropped(DropReason),
    /// Released by the owner.
    Closed,
}

/// A continuously refreshed copy of one store collection.
pub struct LiveCollection<E: Entity> {
    collection: Arc<dyn DocumentCollection<E>>,
    handle: Option<SubscriptionHandle<E>>,
    current: Snapshot<E>,
    state: LiveState,
}

impl<E: Entity> LiveCollection<E> {
    /// Subscribe to `collection` and take in the initial snapshot.
    pub fn open(collection: Arc<dyn DocumentCollection<E>>) -> Result<Self, StoreError> {
        let handle = collection.subscribe()?;
        let mut live = Self {
            collection,
            handle: Some(handle),
            current: Snapshot::empty(),
            state: LiveState::Live,
        };
        live.pump();
        Ok(live)
    }

    /// The materialized snapshot.
    pub fn snapshot(&self) -> &Snapshot<E> {
        &self.current
    }

    pub fn items(&self) -> &[E] {
        &self.current.items
    }

    pub fn state(&self) -> &LiveState {
        &self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == LiveState::Live
    }

    /// Apply every pending delivery without blocking. Returns true if the
    /// materialization changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        let mut resubscribed = false;
        loop {
            let event = match self.handle.as_ref().map(|h| h.try_recv()) {
                Some(Ok(event)) => event,
                Some(Err(TryRecvError::Empty)) => break,
                Some(Err(TryRecvError::Disconnected)) | None => {
                    // At most one reopen per call.
                    if resubscribed || !self.resubscribe() {
                        break;
                    }
                    resubscribed = true;
                    continue;
                }
            };
            changed |= self.accept(event);
        }
        changed
    }

    /// Block until the next delivery or `timeout`, then apply anything else
    /// already pending. Returns true if the materialization changed.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if self.handle.is_none() && !self.resubscribe() {
            return false;
        }
        let first = match self.handle.as_ref().map(|h| h.recv_timeout(timeout)) {
            Some(Ok(event)) => event,
            Some(Err(RecvTimeoutError::Disconnected)) => return self.pump(),
            Some(Err(RecvTimeoutError::Timeout)) | None => return false,
        };
        let changed = self.accept(first);
        self.pump() || changed
    }

    /// Release the subscription. The last snapshot stays readable.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!(collection = E::COLLECTION, "live collection closed");
        }
        self.state = LiveState::Closed;
    }

    fn accept(&mut self, event: SnapshotEvent<E>) -> bool {
        match event {
            SnapshotEvent::Snapshot(snapshot) => {
                if snapshot.version < self.current.version {
                    debug!(
                        collection = E::COLLECTION,
                        stale = ?snapshot.version,
                        current = ?self.current.version,
                        "ignoring stale snapshot"
                    );
                    return false;
                }
                self.current = snapshot;
                true
            }
            SnapshotEvent::Dropped { reason } => {
                warn!(collection = E::COLLECTION, ?reason, "subscription dropped by store");
                self.handle = None;
                self.state = LiveState::Dropped(reason);
                false
            }
        }
    }

    /// Open a fresh subscription unless the owner closed this collection.
    /// The store delivers the current snapshot on it right away.
    fn resubscribe(&mut self) -> bool {
        if self.state == LiveState::Closed {
            return false;
        }
        self.handle = None;
        match self.collection.subscribe() {
            Ok(handle) => {
                debug!(collection = E::COLLECTION, id = handle.id.0, "resubscribed");
                self.handle = Some(handle);
                self.state = LiveState::Live;
                true
            }
            Err(e) => {
                warn!(collection = E::COLLECTION, error = %e, "resubscribe failed");
                if self.state == LiveState::Live {
                    self.state = LiveState::Dropped(DropReason::BufferOverflow);
                }
                false
            }
        }
    }
}

impl<E: Filterable> LiveCollection<E> {
    /// Records of the current snapshot passing `criteria`, newest first.
    pub fn filtered(&self, criteria: &FilterCriteria<E::Status>) -> Vec<&E> {
        filter::apply(&self.current.items, criteria)
    }
}

/// One viewer: a live collection plus the criteria that viewer selected.
pub struct LiveView<E: Filterable> {
    live: LiveCollection<E>,
    criteria: FilterCriteria<E::Status>,
}

impl<E: Filterable> LiveView<E> {
    pub fn new(live: LiveCollection<E>) -> Self {
        Self {
            live,
            criteria: FilterCriteria::default(),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria<E::Status> {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria<E::Status>) {
        self.criteria = criteria;
    }

    pub fn pump(&mut self) -> bool {
        self.live.pump()
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        self.live.wait(timeout)
    }

    /// The visible subset, recomputed from the latest snapshot.
    pub fn visible(&self) -> Vec<&E> {
        self.live.filtered(&self.criteria)
    }

    pub fn collection(&self) -> &LiveCollection<E> {
        &self.live
    }

    pub fn close(&mut self) {
        self.live.close();
    }
}
