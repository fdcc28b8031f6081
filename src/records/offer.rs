//! Offers of surplus food posted by providers.

use super::{datetime_local, non_blank, require, Created, Entity};
use crate::error::ValidationError;
use crate::types::{DocumentId, IdentityId, Sequence, Timestamp};
use crate::workflow::{Lifecycle, OfferStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dietary type of offered food.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodType {
    #[default]
    Veg,
    #[serde(rename = "Non-Veg")]
    NonVeg,
    Mixed,
}

impl FoodType {
    pub fn label(self) -> &'static str {
        match self {
            FoodType::Veg => "Veg",
            FoodType::NonVeg => "Non-Veg",
            FoodType::Mixed => "Mixed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        [FoodType::Veg, FoodType::NonVeg, FoodType::Mixed]
            .into_iter()
            .find(|t| t.label() == label)
    }
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of offered food.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Cooked,
    Packaged,
    Bakery,
    Others,
}

/// Who claimed an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Acceptor {
    pub name: String,
    pub contact: String,
}

impl Acceptor {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }
}

/// Offer form as submitted by a provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct OfferForm {
    pub provider_name: String,
    pub contact: String,
    pub location: String,
    pub quantity: String,
    pub food_type: FoodType,
    pub category: Category,
    #[serde(deserialize_with = "datetime_local::deserialize")]
    pub prepared_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "datetime_local::deserialize")]
    pub best_before: Option<NaiveDateTime>,
    pub notes: String,
}

impl OfferForm {
    /// Parse a form payload, rejecting unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check required fields and produce a draft owned by `creator`.
    pub fn validate(&self, creator: &IdentityId) -> Result<NewOffer, ValidationError> {
        require(&[
            ("providerName", self.provider_name.as_str()),
            ("contact", self.contact.as_str()),
            ("location", self.location.as_str()),
            ("quantity", self.quantity.as_str()),
        ])?;

        Ok(NewOffer {
            provider_name: self.provider_name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            location: self.location.trim().to_string(),
            quantity: self.quantity.trim().to_string(),
            food_type: self.food_type,
            category: self.category,
            prepared_at: self.prepared_at,
            best_before: self.best_before,
            notes: non_blank(&self.notes),
            created_by: creator.clone(),
        })
    }
}

/// A validated offer awaiting its store-assigned identity.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOffer {
    pub provider_name: String,
    pub contact: String,
    pub location: String,
    pub quantity: String,
    pub food_type: FoodType,
    pub category: Category,
    pub prepared_at: Option<NaiveDateTime>,
    pub best_before: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_by: IdentityId,
}

/// A stored offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Offer {
    pub id: DocumentId,
    pub provider_name: String,
    pub contact: String,
    pub location: String,
    pub quantity: String,
    pub food_type: FoodType,
    pub category: Category,
    pub prepared_at: Option<NaiveDateTime>,
    pub best_before: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub status: OfferStatus,
    pub created_by: IdentityId,
    pub sequence: Sequence,
    pub created_at: Timestamp,
    /// Set exactly when the offer leaves `Posted`.
    pub accepted_by: Option<Acceptor>,
}

impl Entity for Offer {
    type Status = OfferStatus;
    type Draft = NewOffer;
    type Counterpart = Acceptor;

    const COLLECTION: &'static str = "foodOffers";

    fn materialize(id: DocumentId, created: Created, draft: NewOffer) -> Self {
        Self {
            id,
            provider_name: draft.provider_name,
            contact: draft.contact,
            location: draft.location,
            quantity: draft.quantity,
            food_type: draft.food_type,
            category: draft.category,
            prepared_at: draft.prepared_at,
            best_before: draft.best_before,
            notes: draft.notes,
            status: OfferStatus::INITIAL,
            created_by: draft.created_by,
            sequence: created.sequence,
            created_at: created.timestamp,
            accepted_by: None,
        }
    }

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn status(&self) -> OfferStatus {
        self.status
    }

    fn sequence(&self) -> Sequence {
        self.sequence
    }

    fn created_by(&self) -> &IdentityId {
        &self.created_by
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn check_counterpart(
        to: OfferStatus,
        acceptor: Option<&Acceptor>,
    ) -> Result<(), ValidationError> {
        match (to, acceptor) {
            (OfferStatus::Accepted, Some(a))
                if !a.name.trim().is_empty() && !a.contact.trim().is_empty() =>
            {
                Ok(())
            }
            (OfferStatus::Accepted, _) => Err(ValidationError::MissingAcceptor),
            (_, Some(_)) => Err(ValidationError::UnexpectedAcceptor),
            (_, None) => Ok(()),
        }
    }

    fn apply(&mut self, status: OfferStatus, acceptor: Option<Acceptor>) {
        self.status = status;
        if let Some(acceptor) = acceptor {
            self.accepted_by = Some(acceptor);
        }
    }
}
