//! Real-time document store.
//!
//! The engine talks to the store only through [`DocumentCollection`]: create,
//! read, compare-and-set status update and standing subscriptions.
//! [`MemoryStore`] is the in-process implementation, one
//! [`MemoryCollection`] per record kind sharing a store-wide sequence.

use crate::coordinator::CoordinatorConfig;
use crate::error::StoreError;
use crate::records::{Created, Entity, Offer, Request};
use crate::subscriptions::{Snapshot, SubscriptionConfig, SubscriptionHandle, SubscriptionManager};
use crate::types::{DocumentId, Sequence, Timestamp};
use crate::workflow::Lifecycle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A whitelisted post-creation write: a status transition plus the
/// counterpart field it may carry.
#[derive(Clone, Debug)]
pub struct Update<E: Entity> {
    /// Status the record must still have for the write to apply.
    pub expected: E::Status,
    pub status: E::Status,
    pub counterpart: Option<E::Counterpart>,
}

impl<E: Entity> Update<E> {
    pub fn transition(expected: E::Status, status: E::Status) -> Self {
        Self {
            expected,
            status,
            counterpart: None,
        }
    }

    pub fn with_counterpart(mut self, counterpart: Option<E::Counterpart>) -> Self {
        self.counterpart = counterpart;
        self
    }
}

/// One named collection of the document store.
pub trait DocumentCollection<E: Entity>: Send + Sync {
    /// Insert a new record. The store assigns id, sequence and timestamp.
    fn create(&self, draft: E::Draft) -> Result<DocumentId, StoreError>;

    /// Read the current version of a record.
    fn get(&self, id: &DocumentId) -> Result<Option<E>, StoreError>;

    /// Apply `update` if the record's status still equals `update.expected`.
    fn update(&self, id: &DocumentId, update: Update<E>) -> Result<(), StoreError>;

    /// Open a standing subscription, ordered newest first. The current
    /// snapshot is delivered immediately.
    fn subscribe(&self) -> Result<SubscriptionHandle<E>, StoreError>;
}

/// State shared by every collection of one store.
#[derive(Debug)]
struct Shared {
    sequence: AtomicU64,
    online: AtomicBool,
}

impl Shared {
    fn advance(&self) -> Sequence {
        Sequence(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn current(&self) -> Sequence {
        Sequence(self.sequence.load(Ordering::SeqCst))
    }

    fn ensure_online(&self, collection: &str) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            warn!(collection, "store unavailable");
            Err(StoreError::Unavailable(format!("{} is offline", collection)))
        }
    }
}

struct CollectionState<E> {
    /// Newest first.
    records: Vec<E>,
    version: Sequence,
}

impl<E: Entity> CollectionState<E> {
    fn snapshot(&self) -> Snapshot<E> {
        Snapshot::new(self.version, self.records.clone())
    }
}

/// In-memory collection.
pub struct MemoryCollection<E: Entity> {
    shared: Arc<Shared>,
    state: Mutex<CollectionState<E>>,
    subscriptions: SubscriptionManager<E>,
    config: SubscriptionConfig,
}

impl<E: Entity> MemoryCollection<E> {
    fn new(shared: Arc<Shared>, config: SubscriptionConfig) -> Self {
        Self {
            shared,
            state: Mutex::new(CollectionState {
                records: Vec::new(),
                version: Sequence::default(),
            }),
            subscriptions: SubscriptionManager::new(),
            config,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store version of the last write to this collection.
    pub fn version(&self) -> Sequence {
        self.state.lock().version
    }

    /// Current snapshot, without subscribing.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.state.lock().snapshot()
    }

    /// Number of open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    /// Publish while the state lock is held so deliveries follow write order.
    fn publish(&self, state: &CollectionState<E>) {
        self.subscriptions.broadcast(&state.snapshot());
    }
}

impl<E: Entity> DocumentCollection<E> for MemoryCollection<E> {
    fn create(&self, draft: E::Draft) -> Result<DocumentId, StoreError> {
        self.shared.ensure_online(E::COLLECTION)?;

        let mut state = self.state.lock();
        let sequence = self.shared.advance();
        let id = DocumentId::generate();
        let record = E::materialize(
            id.clone(),
            Created {
                sequence,
                timestamp: Timestamp::now(),
            },
            draft,
        );

        // Sequences only grow, so inserting at the front keeps newest first.
        state.records.insert(0, record);
        state.version = sequence;
        debug!(collection = E::COLLECTION, %id, ?sequence, "record created");

        self.publish(&state);
        Ok(id)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<E>, StoreError> {
        self.shared.ensure_online(E::COLLECTION)?;
        let state = self.state.lock();
        Ok(state.records.iter().find(|r| r.id() == id).cloned())
    }

    fn update(&self, id: &DocumentId, update: Update<E>) -> Result<(), StoreError> {
        self.shared.ensure_online(E::COLLECTION)?;

        let mut state = self.state.lock();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let actual = record.status();
        if actual != update.expected {
            return Err(StoreError::StatusConflict {
                id: id.clone(),
                expected: update.expected.label().to_string(),
                actual: actual.label().to_string(),
            });
        }

        record.apply(update.status, update.counterpart);
        let version = self.shared.advance();
        state.version = version;
        debug!(
            collection = E::COLLECTION,
            %id,
            from = %actual,
            to = %update.status,
            ?version,
            "record updated"
        );

        self.publish(&state);
        Ok(())
    }

    fn subscribe(&self) -> Result<SubscriptionHandle<E>, StoreError> {
        self.shared.ensure_online(E::COLLECTION)?;
        let state = self.state.lock();
        Ok(self.subscriptions.subscribe(&self.config, state.snapshot()))
    }
}

/// In-memory document store holding the offer and request collections.
pub struct MemoryStore {
    shared: Arc<Shared>,
    offers: Arc<MemoryCollection<Offer>>,
    requests: Arc<MemoryCollection<Request>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(SubscriptionConfig::default())
    }

    pub fn with_config(config: SubscriptionConfig) -> Self {
        let shared = Arc::new(Shared {
            sequence: AtomicU64::new(0),
            online: AtomicBool::new(true),
        });
        Self {
            offers: Arc::new(MemoryCollection::new(Arc::clone(&shared), config.clone())),
            requests: Arc::new(MemoryCollection::new(Arc::clone(&shared), config)),
            shared,
        }
    }

    /// Store using the subscription settings of a coordinator config.
    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::with_config(config.subscription.clone())
    }

    pub fn offers(&self) -> Arc<MemoryCollection<Offer>> {
        Arc::clone(&self.offers)
    }

    pub fn requests(&self) -> Arc<MemoryCollection<Request>> {
        Arc::clone(&self.requests)
    }

    /// Simulate losing or regaining the store. While offline every call fails
    /// with [`StoreError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.shared.online.store(online, Ordering::SeqCst);
    }

    /// Store-wide write position.
    pub fn sequence(&self) -> Sequence {
        self.shared.current()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Acceptor, OfferForm, RequestForm};
    use crate::subscriptions::SnapshotEvent;
    use crate::types::IdentityId;
    use crate::workflow::{OfferStatus, RequestStatus};
    use std::time::Duration;

    fn offer_draft(location: &str) -> crate::records::NewOffer {
        OfferForm {
            provider_name: "Bistro".into(),
            contact: "555".into(),
            location: location.into(),
            quantity: "10".into(),
            ..Default::default()
        }
        .validate(&IdentityId::new("p"))
        .unwrap()
    }

    fn next_snapshot<E: Entity>(handle: &SubscriptionHandle<E>) -> Snapshot<E> {
        match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
            SnapshotEvent::Snapshot(s) => s,
            other => panic!("Expected Snapshot event, got {:?}", other),
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = MemoryStore::new();
        let offers = store.offers();

        let id = offers.create(offer_draft("Market Street")).unwrap();
        let offer = offers.get(&id).unwrap().unwrap();

        assert_eq!(offer.status, OfferStatus::Posted);
        assert_eq!(offer.sequence, Sequence(1));
        assert_eq!(offers.len(), 1);
    }

    #[test]
    fn test_snapshot_newest_first() {
        let store = MemoryStore::new();
        let offers = store.offers();
        let a = offers.create(offer_draft("a")).unwrap();
        let b = offers.create(offer_draft("b")).unwrap();
        let c = offers.create(offer_draft("c")).unwrap();

        let snapshot = offers.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn test_sequence_is_store_wide() {
        let store = MemoryStore::new();
        store.offers().create(offer_draft("a")).unwrap();
        let request = RequestForm {
            receiver_name: "R".into(),
            contact: "C".into(),
            location: "L".into(),
            required_quantity: "Q".into(),
            ..Default::default()
        }
        .validate(&IdentityId::new("r"))
        .unwrap();
        let id = store.requests().create(request).unwrap();

        let stored = store.requests().get(&id).unwrap().unwrap();
        assert_eq!(stored.sequence, Sequence(2));
        assert_eq!(stored.status, RequestStatus::Looking);
        assert_eq!(store.sequence(), Sequence(2));
    }

    #[test]
    fn test_update_compare_and_set() {
        let store = MemoryStore::new();
        let offers = store.offers();
        let id = offers.create(offer_draft("a")).unwrap();

        let accept = Update::<Offer>::transition(OfferStatus::Posted, OfferStatus::Accepted)
            .with_counterpart(Some(Acceptor::new("Shelter", "555")));
        offers.update(&id, accept.clone()).unwrap();

        let err = offers.update(&id, accept).unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));

        let offer = offers.get(&id).unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Accepted);
        assert_eq!(offer.accepted_by, Some(Acceptor::new("Shelter", "555")));
    }

    #[test]
    fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .offers()
            .update(
                &DocumentId::from("nope"),
                Update::transition(OfferStatus::Posted, OfferStatus::Accepted),
            )
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(DocumentId::from("nope")));
    }

    #[test]
    fn test_subscription_sees_every_write() {
        let store = MemoryStore::new();
        let offers = store.offers();
        let handle = offers.subscribe().unwrap();
        assert!(next_snapshot(&handle).is_empty());

        let id = offers.create(offer_draft("a")).unwrap();
        let after_create = next_snapshot(&handle);
        assert_eq!(after_create.len(), 1);

        offers
            .update(&id, Update::transition(OfferStatus::Posted, OfferStatus::Accepted)
                .with_counterpart(Some(Acceptor::new("n", "c"))))
            .unwrap();
        let after_update = next_snapshot(&handle);
        assert!(after_update.version > after_create.version);
        assert_eq!(after_update.items[0].status, OfferStatus::Accepted);
    }

    #[test]
    fn test_offline_rejects_everything() {
        let store = MemoryStore::new();
        let offers = store.offers();
        store.set_online(false);

        assert!(matches!(
            offers.create(offer_draft("a")),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(offers.subscribe(), Err(StoreError::Unavailable(_))));
        assert!(offers.is_empty());

        store.set_online(true);
        assert!(offers.create(offer_draft("a")).is_ok());
    }
}
