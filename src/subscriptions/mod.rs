//! Standing subscriptions to store collections.
//!
//! Every change to a collection (create or status update, by anyone)
//! re-delivers the entire ordered collection to every subscriber. There is no
//! diffing and no coalescing; subscribers keep whichever snapshot is newest.
//!
//! Subscriptions use bounded buffers and slow subscribers are dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.offers().subscribe()?;
//!
//! loop {
//!     match handle.recv() {
//!         Ok(SnapshotEvent::Snapshot(snapshot)) => render(&snapshot),
//!         Ok(SnapshotEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! // Dropping `handle` releases the subscription.
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, Snapshot, SnapshotEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
