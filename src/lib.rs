//! # SharePlate
//!
//! Coordination engine for surplus-food offers and food requests.
//!
//! ## Core Concepts
//!
//! - **Records**: offers (from providers) and requests (from receivers)
//! - **Workflow**: strictly linear status machines, checked against the
//!   record's current status on every write
//! - **Live collections**: standing subscriptions that re-deliver the whole
//!   ordered collection on every change
//! - **Filters**: pure viewer-side predicates over a snapshot
//! - **Notifications**: a single self-expiring feedback slot
//!
//! ## Example
//!
//! ```ignore
//! use shareplate::{Acceptor, Coordinator, CoordinatorConfig, IdentityId, MemoryStore, OfferForm};
//!
//! let store = MemoryStore::new();
//! let coordinator = Coordinator::with_store(&store, &CoordinatorConfig::default());
//!
//! let mut view = coordinator.offer_view()?;
//!
//! let id = coordinator.post_offer(&IdentityId::new("provider"), &OfferForm {
//!     provider_name: "Green Bistro".into(),
//!     contact: "555-0100".into(),
//!     location: "Market Street".into(),
//!     quantity: "20 meals".into(),
//!     ..Default::default()
//! })?;
//!
//! coordinator.accept_offer(&IdentityId::new("receiver"), &id, Acceptor::new("Hope Shelter", "555-0111"))?;
//!
//! view.pump();
//! for offer in view.visible() {
//!     println!("{} - {}", offer.provider_name, offer.status);
//! }
//! ```

pub mod coordinator;
pub mod error;
pub mod filter;
pub mod identity;
pub mod notify;
pub mod records;
pub mod store;
pub mod subscriptions;
pub mod sync;
pub mod types;
pub mod workflow;

// Re-exports
pub use coordinator::{Coordinator, CoordinatorConfig, TransitionPolicy};
pub use error::{AuthError, Error, Result, StoreError, ValidationError};
pub use filter::{FilterCriteria, Filterable, FoodTypeFilter, StatusFilter};
pub use identity::{Identity, IdentityProvider, IdentityWatch, MemoryIdentityProvider};
pub use notify::{Clock, ManualClock, Notification, NotificationKind, Notifier, SystemClock};
pub use records::{
    Acceptor, Category, Created, Entity, FoodType, NewOffer, NewRequest, Offer, OfferForm,
    PreferredFoodType, Request, RequestForm,
};
pub use store::{DocumentCollection, MemoryCollection, MemoryStore, Update};
pub use subscriptions::{
    DropReason, Snapshot, SnapshotEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
pub use sync::{LiveCollection, LiveState, LiveView};
pub use types::*;
pub use workflow::{Lifecycle, OfferStatus, RequestStatus};
