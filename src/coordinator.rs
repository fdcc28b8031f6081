//! The write path: validation, guarded status transitions and feedback.
//!
//! A write is validated locally, sent to the store and reported through the
//! [`Notifier`]. The coordinator never mutates a local copy of the data; a
//! successful write becomes visible through the next snapshot delivered to
//! every [`LiveCollection`].

use crate::error::{Error, Result, StoreError, ValidationError};
use crate::filter::Filterable;
use crate::notify::{Notifier, SystemClock, DEFAULT_NOTIFICATION_TTL};
use crate::records::{Acceptor, Entity, Offer, OfferForm, Request, RequestForm};
use crate::store::{DocumentCollection, MemoryStore, Update};
use crate::subscriptions::SubscriptionConfig;
use crate::sync::{LiveCollection, LiveView};
use crate::types::{DocumentId, IdentityId};
use crate::workflow::{Lifecycle, OfferStatus, RequestStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Who may advance a record's status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Anyone but the record's creator.
    #[default]
    Counterparty,
    /// Any authenticated caller.
    Permissive,
}

/// Coordinator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long a notification stays visible, in milliseconds.
    /// Default: 3000
    pub notification_ttl_ms: u64,

    /// Buffering for standing subscriptions.
    pub subscription: SubscriptionConfig,

    pub transition_policy: TransitionPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL.as_millis() as u64,
            subscription: SubscriptionConfig::default(),
            transition_policy: TransitionPolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

/// Coordinates offers and requests over a document store.
pub struct Coordinator {
    offers: Arc<dyn DocumentCollection<Offer>>,
    requests: Arc<dyn DocumentCollection<Request>>,
    notifier: Arc<Notifier>,
    policy: TransitionPolicy,
}

impl Coordinator {
    pub fn new(
        offers: Arc<dyn DocumentCollection<Offer>>,
        requests: Arc<dyn DocumentCollection<Request>>,
        notifier: Arc<Notifier>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            offers,
            requests,
            notifier,
            policy,
        }
    }

    /// Coordinator over an in-memory store, notifying on the system clock.
    ///
    /// `config.subscription` is a store setting; build the store with
    /// [`MemoryStore::from_config`] so both halves share one config.
    pub fn with_store(store: &MemoryStore, config: &CoordinatorConfig) -> Self {
        let notifier = Notifier::new(Arc::new(SystemClock::new()), config.notification_ttl());
        Self::new(
            store.offers(),
            store.requests(),
            Arc::new(notifier),
            config.transition_policy,
        )
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    // --- Creation ---

    /// Validate and post an offer on behalf of `caller`.
    pub fn post_offer(&self, caller: &IdentityId, form: &OfferForm) -> Result<DocumentId> {
        let result = self.create(self.offers.as_ref(), form.validate(caller));
        match &result {
            Ok(id) => {
                info!(%id, %caller, "offer posted");
                self.notifier.success("Food offer posted successfully!");
            }
            Err(e) => self.report(e, "Error posting food offer. Please try again."),
        }
        result
    }

    /// Validate and post a request on behalf of `caller`.
    pub fn post_request(&self, caller: &IdentityId, form: &RequestForm) -> Result<DocumentId> {
        let result = self.create(self.requests.as_ref(), form.validate(caller));
        match &result {
            Ok(id) => {
                info!(%id, %caller, "request posted");
                self.notifier.success("Food request posted successfully!");
            }
            Err(e) => self.report(e, "Error posting food request. Please try again."),
        }
        result
    }

    fn create<E: Entity>(
        &self,
        collection: &dyn DocumentCollection<E>,
        draft: std::result::Result<E::Draft, ValidationError>,
    ) -> Result<DocumentId> {
        let draft = draft?;
        Ok(collection.create(draft)?)
    }

    // --- Transitions ---

    /// Move an offer to `to`. Accepting requires `acceptor`; every other
    /// step must not carry one.
    pub fn advance_offer(
        &self,
        caller: &IdentityId,
        id: &DocumentId,
        to: OfferStatus,
        acceptor: Option<Acceptor>,
    ) -> Result<()> {
        let result = self.transition(self.offers.as_ref(), caller, id, to, acceptor);
        self.report_transition(&result, to);
        result
    }

    /// Claim a posted offer.
    pub fn accept_offer(&self, caller: &IdentityId, id: &DocumentId, acceptor: Acceptor) -> Result<()> {
        self.advance_offer(caller, id, OfferStatus::Accepted, Some(acceptor))
    }

    /// Move a request to `to`.
    pub fn advance_request(&self, caller: &IdentityId, id: &DocumentId, to: RequestStatus) -> Result<()> {
        let result = self.transition(self.requests.as_ref(), caller, id, to, None);
        self.report_transition(&result, to);
        result
    }

    /// Mark a request as matched and record the offer that serves it.
    ///
    /// The offer must exist when the match is made; the store does not keep
    /// the reference valid afterwards.
    pub fn match_request(
        &self,
        caller: &IdentityId,
        request_id: &DocumentId,
        offer_id: &DocumentId,
    ) -> Result<()> {
        let result = match self.offers.get(offer_id) {
            Ok(Some(_)) => self.transition(
                self.requests.as_ref(),
                caller,
                request_id,
                RequestStatus::Matched,
                Some(offer_id.clone()),
            ),
            Ok(None) => Err(Error::NotFound(offer_id.clone())),
            Err(e) => Err(e.into()),
        };
        self.report_transition(&result, RequestStatus::Matched);
        result
    }

    /// Read-check-write: validate against the record's current status, then
    /// let the store apply the write only if that status is still current.
    fn transition<E: Entity>(
        &self,
        collection: &dyn DocumentCollection<E>,
        caller: &IdentityId,
        id: &DocumentId,
        to: E::Status,
        counterpart: Option<E::Counterpart>,
    ) -> Result<()> {
        let current = collection
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.authorize(caller, &current, to)?;

        let from = current.status();
        from.check_transition(to)?;
        // Only a legal step gets its counterpart checked.
        E::check_counterpart(to, counterpart.as_ref())?;

        let update = Update::<E>::transition(from, to).with_counterpart(counterpart);
        match collection.update(id, update) {
            Ok(()) => {
                info!(collection = E::COLLECTION, %id, %from, %to, %caller, "status advanced");
                Ok(())
            }
            // Someone else advanced it between our read and our write.
            Err(StoreError::StatusConflict { actual, .. }) => {
                Err(Error::invalid_transition(actual, to))
            }
            Err(StoreError::NotFound(id)) => Err(Error::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn authorize<E: Entity>(&self, caller: &IdentityId, record: &E, to: E::Status) -> Result<()> {
        match self.policy {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Counterparty if record.created_by() == caller => {
                Err(Error::Unauthorized {
                    identity: caller.clone(),
                    action: format!("move their own {} record to {}", E::COLLECTION, to),
                })
            }
            TransitionPolicy::Counterparty => Ok(()),
        }
    }

    // --- Feedback ---

    fn report_transition<S: Lifecycle>(&self, result: &Result<()>, to: S) {
        match result {
            Ok(()) => self
                .notifier
                .success(format!("Status updated to: {}", to.label())),
            Err(e) => self.report(e, "Error updating status. Please try again."),
        }
    }

    fn report(&self, err: &Error, store_message: &str) {
        warn!(error = %err, "write failed");
        let message = match err {
            Error::Validation(ValidationError::MissingFields(_)) => {
                "Please fill in all required fields!".to_string()
            }
            Error::Store(_) => store_message.to_string(),
            other => other.to_string(),
        };
        self.notifier.error(message);
    }

    // --- Live views ---

    /// Open a standing subscription to all offers.
    pub fn live_offers(&self) -> Result<LiveCollection<Offer>> {
        Ok(LiveCollection::open(Arc::clone(&self.offers))?)
    }

    /// Open a standing subscription to all requests.
    pub fn live_requests(&self) -> Result<LiveCollection<Request>> {
        Ok(LiveCollection::open(Arc::clone(&self.requests))?)
    }

    /// A receiver's view: every offer, filterable.
    pub fn offer_view(&self) -> Result<LiveView<Offer>> {
        self.view(&self.offers)
    }

    /// A provider's view: every request, filterable.
    pub fn request_view(&self) -> Result<LiveView<Request>> {
        self.view(&self.requests)
    }

    fn view<E: Filterable>(&self, collection: &Arc<dyn DocumentCollection<E>>) -> Result<LiveView<E>> {
        Ok(LiveView::new(LiveCollection::open(Arc::clone(collection))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ManualClock, NotificationKind};

    fn setup(policy: TransitionPolicy) -> (MemoryStore, Arc<ManualClock>, Coordinator) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new());
        let notifier = Arc::new(Notifier::new(clock.clone(), DEFAULT_NOTIFICATION_TTL));
        let coordinator = Coordinator::new(store.offers(), store.requests(), notifier, policy);
        (store, clock, coordinator)
    }

    fn offer_form() -> OfferForm {
        OfferForm {
            provider_name: "Green Bistro".into(),
            contact: "555-0100".into(),
            location: "Market Street".into(),
            quantity: "20 meals".into(),
            ..Default::default()
        }
    }

    fn request_form() -> RequestForm {
        RequestForm {
            receiver_name: "Hope Shelter".into(),
            contact: "555-0111".into(),
            location: "Oak Ave".into(),
            required_quantity: "40 meals".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_post_offer_notifies() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let id = c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();

        assert!(store.offers().get(&id).unwrap().is_some());
        let n = c.notifier().current().unwrap();
        assert_eq!(n.kind, NotificationKind::Success);
        assert_eq!(n.message, "Food offer posted successfully!");
    }

    #[test]
    fn test_invalid_offer_never_written() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let mut form = offer_form();
        form.location.clear();

        let err = c.post_offer(&IdentityId::new("p"), &form).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingFields(_))));
        assert!(store.offers().is_empty());
        assert_eq!(store.sequence().0, 0);

        let n = c.notifier().current().unwrap();
        assert_eq!(n.kind, NotificationKind::Error);
        assert_eq!(n.message, "Please fill in all required fields!");
    }

    #[test]
    fn test_counterparty_policy() {
        let (_store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let provider = IdentityId::new("p");
        let id = c.post_offer(&provider, &offer_form()).unwrap();

        let err = c
            .accept_offer(&provider, &id, Acceptor::new("Me", "555"))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));

        c.accept_offer(&IdentityId::new("r"), &id, Acceptor::new("Shelter", "555"))
            .unwrap();
    }

    #[test]
    fn test_permissive_policy() {
        let (_store, _clock, c) = setup(TransitionPolicy::Permissive);
        let provider = IdentityId::new("p");
        let id = c.post_offer(&provider, &offer_form()).unwrap();
        c.accept_offer(&provider, &id, Acceptor::new("Me", "555")).unwrap();
    }

    #[test]
    fn test_match_request_records_offer() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let offer = c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();
        let request = c.post_request(&IdentityId::new("r"), &request_form()).unwrap();

        c.match_request(&IdentityId::new("p"), &request, &offer).unwrap();
        let stored = store.requests().get(&request).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Matched);
        assert_eq!(stored.matched_offer_id, Some(offer));
        assert_eq!(
            c.notifier().current().unwrap().message,
            "Status updated to: Matched"
        );
    }

    #[test]
    fn test_match_unknown_offer() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let request = c.post_request(&IdentityId::new("r"), &request_form()).unwrap();

        let err = c
            .match_request(&IdentityId::new("p"), &request, &DocumentId::from("ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let stored = store.requests().get(&request).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Looking);
    }

    #[test]
    fn test_store_failure_reported() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let id = c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();

        store.set_online(false);
        let err = c
            .accept_offer(&IdentityId::new("r"), &id, Acceptor::new("S", "1"))
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert_eq!(
            c.notifier().current().unwrap().message,
            "Error updating status. Please try again."
        );

        store.set_online(true);
        let offer = store.offers().get(&id).unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Posted);
        assert_eq!(offer.accepted_by, None);

        // Still usable after the failure.
        c.accept_offer(&IdentityId::new("r"), &id, Acceptor::new("S", "1"))
            .unwrap();
    }

    #[test]
    fn test_backward_step_without_acceptor_is_invalid_transition() {
        let (store, _clock, c) = setup(TransitionPolicy::Counterparty);
        let receiver = IdentityId::new("r");
        let id = c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();
        c.accept_offer(&receiver, &id, Acceptor::new("S", "1")).unwrap();
        c.advance_offer(&receiver, &id, OfferStatus::PickedUp, None)
            .unwrap();

        let err = c
            .advance_offer(&receiver, &id, OfferStatus::Accepted, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let offer = store.offers().get(&id).unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::PickedUp);
    }

    #[test]
    fn test_in_memory_store_uses_subscription_config() {
        let config = CoordinatorConfig::from_json(r#"{"subscription": {"buffer_size": 1}}"#).unwrap();
        let store = MemoryStore::from_config(&config);
        let c = Coordinator::with_store(&store, &config);

        // The initial snapshot fills the one-slot buffer; the next write overflows it.
        let _handle = store.offers().subscribe().unwrap();
        assert_eq!(store.offers().subscription_count(), 1);
        c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();
        assert_eq!(store.offers().subscription_count(), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config = CoordinatorConfig::from_json(
            r#"{"notification_ttl_ms": 1500, "transition_policy": "permissive"}"#,
        )
        .unwrap();
        assert_eq!(config.notification_ttl(), Duration::from_millis(1500));
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(config.subscription.buffer_size, 64);

        let defaults = CoordinatorConfig::from_json("{}").unwrap();
        assert_eq!(defaults.notification_ttl(), Duration::from_secs(3));
        assert_eq!(defaults.transition_policy, TransitionPolicy::Counterparty);
    }
}
