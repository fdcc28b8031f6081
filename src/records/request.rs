//! Food requests posted by receivers.

use super::{non_blank, require, Created, Entity, FoodType};
use crate::error::ValidationError;
use crate::types::{DocumentId, IdentityId, Sequence, Timestamp};
use crate::workflow::{Lifecycle, RequestStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dietary preference of a receiver. `Any` accepts every food type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredFoodType {
    #[default]
    Any,
    Veg,
    #[serde(rename = "Non-Veg")]
    NonVeg,
}

impl PreferredFoodType {
    pub fn label(self) -> &'static str {
        match self {
            PreferredFoodType::Any => "Any",
            PreferredFoodType::Veg => "Veg",
            PreferredFoodType::NonVeg => "Non-Veg",
        }
    }

    /// Whether a receiver with this preference takes food of type `food`.
    pub fn accepts(self, food: FoodType) -> bool {
        match self {
            PreferredFoodType::Any => true,
            PreferredFoodType::Veg => food == FoodType::Veg,
            PreferredFoodType::NonVeg => food == FoodType::NonVeg,
        }
    }
}

impl fmt::Display for PreferredFoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Request form as submitted by a receiver.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RequestForm {
    pub receiver_name: String,
    pub org_name: String,
    pub contact: String,
    pub location: String,
    pub required_quantity: String,
    pub preferred_food_type: PreferredFoodType,
    pub time_window: String,
    pub notes: String,
}

impl RequestForm {
    /// Parse a form payload, rejecting unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check required fields and produce a draft owned by `creator`.
    pub fn validate(&self, creator: &IdentityId) -> Result<NewRequest, ValidationError> {
        require(&[
            ("receiverName", self.receiver_name.as_str()),
            ("contact", self.contact.as_str()),
            ("location", self.location.as_str()),
            ("requiredQuantity", self.required_quantity.as_str()),
        ])?;

        Ok(NewRequest {
            receiver_name: self.receiver_name.trim().to_string(),
            org_name: non_blank(&self.org_name),
            contact: self.contact.trim().to_string(),
            location: self.location.trim().to_string(),
            required_quantity: self.required_quantity.trim().to_string(),
            preferred_food_type: self.preferred_food_type,
            time_window: non_blank(&self.time_window),
            notes: non_blank(&self.notes),
            created_by: creator.clone(),
        })
    }
}

/// A validated request awaiting its store-assigned identity.
#[derive(Clone, Debug, PartialEq)]
pub struct NewRequest {
    pub receiver_name: String,
    pub org_name: Option<String>,
    pub contact: String,
    pub location: String,
    pub required_quantity: String,
    pub preferred_food_type: PreferredFoodType,
    pub time_window: Option<String>,
    pub notes: Option<String>,
    pub created_by: IdentityId,
}

/// A stored request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Request {
    pub id: DocumentId,
    pub receiver_name: String,
    pub org_name: Option<String>,
    pub contact: String,
    pub location: String,
    pub required_quantity: String,
    pub preferred_food_type: PreferredFoodType,
    pub time_window: Option<String>,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_by: IdentityId,
    pub sequence: Sequence,
    pub created_at: Timestamp,
    pub matched_offer_id: Option<DocumentId>,
}

impl Entity for Request {
    type Status = RequestStatus;
    type Draft = NewRequest;
    type Counterpart = DocumentId;

    const COLLECTION: &'static str = "foodRequests";

    fn materialize(id: DocumentId, created: Created, draft: NewRequest) -> Self {
        Self {
            id,
            receiver_name: draft.receiver_name,
            org_name: draft.org_name,
            contact: draft.contact,
            location: draft.location,
            required_quantity: draft.required_quantity,
            preferred_food_type: draft.preferred_food_type,
            time_window: draft.time_window,
            notes: draft.notes,
            status: RequestStatus::INITIAL,
            created_by: draft.created_by,
            sequence: created.sequence,
            created_at: created.timestamp,
            matched_offer_id: None,
        }
    }

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn status(&self) -> RequestStatus {
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
        to: RequestStatus,
        offer: Option<&DocumentId>,
    ) -> Result<(), ValidationError> {
        match (to, offer) {
            (RequestStatus::Matched, _) | (_, None) => Ok(()),
            (_, Some(_)) => Err(ValidationError::UnexpectedMatch),
        }
    }

    fn apply(&mut self, status: RequestStatus, offer: Option<DocumentId>) {
        self.status = status;
        if let Some(offer) = offer {
            self.matched_offer_id = Some(offer);
        }
    }
}
