//! Error handling and edge case tests.

use shareplate::{
    Acceptor, AuthError, Coordinator, DocumentId, Error, IdentityId, IdentityProvider,
    ManualClock, MemoryIdentityProvider, MemoryStore, NotificationKind, Notifier, OfferForm,
    OfferStatus, RequestForm, StoreError, TransitionPolicy, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (MemoryStore, Arc<ManualClock>, Coordinator) {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new());
    let notifier = Arc::new(Notifier::new(clock.clone(), Duration::from_secs(3)));
    let coordinator = Coordinator::new(
        store.offers(),
        store.requests(),
        notifier,
        TransitionPolicy::Counterparty,
    );
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

// --- Validation Errors ---

#[test]
fn test_missing_fields_listed() {
    let (store, _clock, c) = setup();
    let form = RequestForm {
        receiver_name: "Shelter".into(),
        location: "   ".into(),
        ..Default::default()
    };

    let err = c.post_request(&IdentityId::new("r"), &form).unwrap_err();
    match err {
        Error::Validation(ValidationError::MissingFields(fields)) => {
            assert_eq!(fields, vec!["contact", "location", "requiredQuantity"]);
        }
        other => panic!("Expected MissingFields, got {:?}", other),
    }
    assert!(store.requests().is_empty());
}

#[test]
fn test_unknown_form_field_rejected() {
    let err = OfferForm::from_json(
        r#"{"providerName": "A", "contact": "1", "location": "L", "quantity": "Q", "status": "Delivered"}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
}

#[test]
fn test_form_from_json_defaults() {
    let form = OfferForm::from_json(
        r#"{"providerName": "A", "contact": "1", "location": "L", "quantity": "Q"}"#,
    )
    .unwrap();
    let (_store, _clock, c) = setup();
    let id = c.post_offer(&IdentityId::new("p"), &form).unwrap();
    assert!(!id.as_str().is_empty());
}

// --- Lookup and Authorization ---

#[test]
fn test_advance_unknown_offer() {
    let (_store, _clock, c) = setup();
    let err = c
        .accept_offer(
            &IdentityId::new("r"),
            &DocumentId::from("missing"),
            Acceptor::new("S", "1"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(c.notifier().current().unwrap().kind, NotificationKind::Error);
}

#[test]
fn test_creator_cannot_advance_own_offer() {
    let (store, _clock, c) = setup();
    let provider = IdentityId::new("p");
    let id = c.post_offer(&provider, &offer_form()).unwrap();

    let err = c
        .accept_offer(&provider, &id, Acceptor::new("Self", "1"))
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(
        store.offers().snapshot().get(&id).unwrap().status,
        OfferStatus::Posted
    );
}

// --- Store Errors ---

#[test]
fn test_post_while_offline() {
    let (store, _clock, c) = setup();
    store.set_online(false);

    let err = c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    let n = c.notifier().current().unwrap();
    assert_eq!(n.kind, NotificationKind::Error);
    assert_eq!(n.message, "Error posting food offer. Please try again.");

    assert!(matches!(c.live_offers(), Err(Error::Store(_))));

    store.set_online(true);
    c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();
    assert_eq!(store.offers().len(), 1);
}

#[test]
fn test_live_collection_survives_outage() {
    let (store, _clock, c) = setup();
    let mut live = c.live_offers().unwrap();

    store.set_online(false);
    assert!(c.post_offer(&IdentityId::new("p"), &offer_form()).is_err());
    store.set_online(true);

    c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();
    assert!(live.pump());
    assert!(live.is_live());
    assert_eq!(live.items().len(), 1);
}

// --- Notifications ---

#[test]
fn test_notification_expires_after_ttl() {
    let (_store, clock, c) = setup();
    c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();

    clock.advance(Duration::from_millis(2999));
    assert!(c.notifier().current().is_some());

    clock.advance(Duration::from_millis(1));
    assert!(c.notifier().current().is_none());
}

#[test]
fn test_newer_notification_restarts_timer() {
    let (_store, clock, c) = setup();
    c.post_offer(&IdentityId::new("p"), &offer_form()).unwrap();

    clock.advance(Duration::from_secs(2));
    let _ = c.post_offer(&IdentityId::new("p"), &OfferForm::default());

    clock.advance(Duration::from_secs(2));
    let n = c.notifier().current().unwrap();
    assert_eq!(n.message, "Please fill in all required fields!");

    clock.advance(Duration::from_secs(1));
    assert!(c.notifier().current().is_none());
}

// --- Identity ---

#[test]
fn test_auth_errors_convert() {
    let auth = MemoryIdentityProvider::new();
    let err: Error = auth.login("nobody@example.org", "secret1").unwrap_err().into();
    assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));

    auth.register("Asha", "asha@example.org", "secret1").unwrap();
    let err: Error = auth
        .register("Asha", "asha@example.org", "secret2")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Auth(AuthError::EmailInUse(_))));
}

#[test]
fn test_logged_subscriber_sees_failures() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (store, _clock, c) = setup();
    store.set_online(false);
    assert!(c.post_request(&IdentityId::new("r"), &RequestForm::default()).is_err());
    assert!(store.requests().is_empty());
}
