//! Error types for the coordination engine.

use crate::types::{DocumentId, IdentityId};
use thiserror::Error;

/// Main error type for coordinator operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("{identity} may not {action}")]
    Unauthorized { identity: IdentityId, action: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    pub(crate) fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// A submission that never reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("acceptor name and contact are required to accept an offer")]
    MissingAcceptor,

    #[error("acceptor details can only be recorded when an offer is accepted")]
    UnexpectedAcceptor,

    #[error("matched offer can only be recorded when a request is matched")]
    UnexpectedMatch,

    #[error("malformed form: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e.to_string())
    }
}

/// Failures reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Status of {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: DocumentId,
        expected: String,
        actual: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Failures reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Display name is required")]
    MissingName,

    #[error("Invalid email or password")]
    InvalidCredentials,
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;
