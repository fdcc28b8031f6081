//! Status values for offers and requests.

use super::Lifecycle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfillment status of an offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferStatus {
    Posted,
    Accepted,
    #[serde(rename = "Picked Up")]
    PickedUp,
    #[serde(rename = "On the Way")]
    OnTheWay,
    Delivered,
}

impl Lifecycle for OfferStatus {
    const INITIAL: Self = OfferStatus::Posted;

    const ALL: &'static [Self] = &[
        OfferStatus::Posted,
        OfferStatus::Accepted,
        OfferStatus::PickedUp,
        OfferStatus::OnTheWay,
        OfferStatus::Delivered,
    ];

    fn next(self) -> Option<Self> {
        match self {
            OfferStatus::Posted => Some(OfferStatus::Accepted),
            OfferStatus::Accepted => Some(OfferStatus::PickedUp),
            OfferStatus::PickedUp => Some(OfferStatus::OnTheWay),
            OfferStatus::OnTheWay => Some(OfferStatus::Delivered),
            OfferStatus::Delivered => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            OfferStatus::Posted => "Posted",
            OfferStatus::Accepted => "Accepted",
            OfferStatus::PickedUp => "Picked Up",
            OfferStatus::OnTheWay => "On the Way",
            OfferStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fulfillment status of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Looking,
    Matched,
    Fulfilled,
    /// Defined for completeness; no transition produces it.
    Cancelled,
}

impl Lifecycle for RequestStatus {
    const INITIAL: Self = RequestStatus::Looking;

    const ALL: &'static [Self] = &[
        RequestStatus::Looking,
        RequestStatus::Matched,
        RequestStatus::Fulfilled,
        RequestStatus::Cancelled,
    ];

    fn next(self) -> Option<Self> {
        match self {
            RequestStatus::Looking => Some(RequestStatus::Matched),
            RequestStatus::Matched => Some(RequestStatus::Fulfilled),
            RequestStatus::Fulfilled | RequestStatus::Cancelled => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RequestStatus::Looking => "Looking",
            RequestStatus::Matched => "Matched",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
