//! Offer and request records.
//!
//! Records are closed structs: the only fields that change after creation are
//! the status and the counterpart fields written together with a transition
//! (the acceptor of an offer, the matched offer of a request).

mod offer;
mod request;

pub use offer::{Acceptor, Category, FoodType, NewOffer, Offer, OfferForm};
pub use request::{NewRequest, PreferredFoodType, Request, RequestForm};

use crate::error::ValidationError;
use crate::types::{DocumentId, IdentityId, Sequence, Timestamp};
use crate::workflow::Lifecycle;
use std::fmt;

/// Creation metadata stamped by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Created {
    pub sequence: Sequence,
    pub timestamp: Timestamp,
}

/// A record kind living in its own store collection.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Status lifecycle of this kind.
    type Status: Lifecycle;
    /// Validated creation payload.
    type Draft: Clone + fmt::Debug + Send + Sync + 'static;
    /// Nullable field written alongside a transition.
    type Counterpart: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// Name of the store collection.
    const COLLECTION: &'static str;

    /// Build the stored record from a draft. Status starts at `Status::INITIAL`.
    fn materialize(id: DocumentId, created: Created, draft: Self::Draft) -> Self;

    fn id(&self) -> &DocumentId;
    fn status(&self) -> Self::Status;
    fn sequence(&self) -> Sequence;
    fn created_by(&self) -> &IdentityId;
    fn location(&self) -> &str;

    /// Check which transitions may carry a counterpart value.
    fn check_counterpart(
        to: Self::Status,
        counterpart: Option<&Self::Counterpart>,
    ) -> Result<(), ValidationError>;

    /// Apply a transition. Counterpart fields are only ever set, never cleared.
    fn apply(&mut self, status: Self::Status, counterpart: Option<Self::Counterpart>);
}

/// Trim a form value, mapping blank text to `None`.
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collect required fields that are blank.
pub(crate) fn require(
    fields: &[(&'static str, &str)],
) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// Form timestamps as sent by `datetime-local` inputs: seconds optional,
/// empty string means unset.
pub(crate) mod datetime_local {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer};

    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid date-time: {}", value))
            }),
        }
    }
}
