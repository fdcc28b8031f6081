//! Viewer-side filtering over a materialized snapshot.
//!
//! Everything here is pure: filters borrow the snapshot and return the
//! visible subset in snapshot order.

use crate::records::{Entity, FoodType, Offer, Request};
use crate::workflow::{Lifecycle, OfferStatus};
use serde::{Deserialize, Serialize};

/// Food-type criterion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodTypeFilter {
    #[default]
    All,
    Only(FoodType),
}

impl FoodTypeFilter {
    /// Parse a viewer selection: `"All"` or a food type label.
    pub fn parse(label: &str) -> Option<Self> {
        if label == "All" {
            Some(FoodTypeFilter::All)
        } else {
            FoodType::parse(label).map(FoodTypeFilter::Only)
        }
    }
}

/// Status criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S> Default for StatusFilter<S> {
    fn default() -> Self {
        StatusFilter::All
    }
}

impl<S: Lifecycle> StatusFilter<S> {
    /// Parse a viewer selection: `"All"` or a status label.
    pub fn parse(label: &str) -> Option<Self> {
        if label == "All" {
            Some(StatusFilter::All)
        } else {
            S::parse(label).map(StatusFilter::Only)
        }
    }

    fn matches(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

/// Transient criteria selected by one viewer. All predicates are ANDed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria<S> {
    /// Case-insensitive substring of the location; empty matches everything.
    pub location: String,
    pub food_type: FoodTypeFilter,
    pub status: StatusFilter<S>,
}

impl<S> Default for FilterCriteria<S> {
    fn default() -> Self {
        Self {
            location: String::new(),
            food_type: FoodTypeFilter::All,
            status: StatusFilter::All,
        }
    }
}

impl<S: Lifecycle> FilterCriteria<S> {
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn food_type(mut self, food_type: FoodTypeFilter) -> Self {
        self.food_type = food_type;
        self
    }

    pub fn status(mut self, status: StatusFilter<S>) -> Self {
        self.status = status;
        self
    }

    /// Evaluate all three predicates against one record.
    pub fn matches<E>(&self, item: &E) -> bool
    where
        E: Filterable<Status = S>,
    {
        self.matches_location(item.location())
            && item.matches_food_type(self.food_type)
            && self.status.matches(item.status())
    }

    fn matches_location(&self, location: &str) -> bool {
        self.location.is_empty()
            || location
                .to_lowercase()
                .contains(&self.location.to_lowercase())
    }
}

/// Records that can be filtered by food type.
pub trait Filterable: Entity {
    fn matches_food_type(&self, filter: FoodTypeFilter) -> bool;
}

impl Filterable for Offer {
    fn matches_food_type(&self, filter: FoodTypeFilter) -> bool {
        match filter {
            FoodTypeFilter::All => true,
            FoodTypeFilter::Only(food) => self.food_type == food,
        }
    }
}

impl Filterable for Request {
    /// A receiver preferring `Any` shows up under every food-type filter.
    fn matches_food_type(&self, filter: FoodTypeFilter) -> bool {
        match filter {
            FoodTypeFilter::All => true,
            FoodTypeFilter::Only(food) => self.preferred_food_type.accepts(food),
        }
    }
}

/// The visible subset of `items`, in their original order.
pub fn apply<'a, E: Filterable>(items: &'a [E], criteria: &FilterCriteria<E::Status>) -> Vec<&'a E> {
    items.iter().filter(|item| criteria.matches(*item)).collect()
}

/// Whether `offer` can still satisfy `request`: the offer is unclaimed and
/// its food type fits the receiver's preference.
pub fn is_compatible(offer: &Offer, request: &Request) -> bool {
    offer.status == OfferStatus::Posted && request.preferred_food_type.accepts(offer.food_type)
}

/// Offers that could satisfy `request`, in snapshot order.
pub fn matching_offers<'a>(request: &Request, offers: &'a [Offer]) -> Vec<&'a Offer> {
    offers
        .iter()
        .filter(|offer| is_compatible(offer, request))
        .collect()
}
