//! Status state machines.
//!
//! Both machines are strictly linear: every non-terminal status has exactly
//! one successor and nothing ever moves backwards.
//!
//! ```text
//! Offer:   Posted -> Accepted -> Picked Up -> On the Way -> Delivered
//! Request: Looking -> Matched -> Fulfilled          (Cancelled: unreachable)
//! ```

mod status;

pub use status::{OfferStatus, RequestStatus};

use crate::error::{Error, Result};
use std::fmt;
use std::hash::Hash;

/// A linear status lifecycle.
pub trait Lifecycle:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Status stamped on creation.
    const INITIAL: Self;

    /// Every defined status, in workflow order.
    const ALL: &'static [Self];

    /// The only legal successor, or `None` for a terminal status.
    fn next(self) -> Option<Self>;

    /// Human-readable label, also used on the wire.
    fn label(self) -> &'static str;

    fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Check that `to` immediately follows `self`.
    fn check_transition(self, to: Self) -> Result<()> {
        if self.next() == Some(to) {
            Ok(())
        } else {
            Err(Error::invalid_transition(self, to))
        }
    }

    /// Parse a label such as `"Picked Up"`.
    fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}
