//! Domain error types.

use common::VisitStatus;
use store::StoreError;
use thiserror::Error;

use crate::products::CatalogError;
use crate::zones::ZoneError;

/// A submitted field broke one of its shape rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Text length outside the allowed range, counted in characters.
    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} is not a valid email address")]
    Email { field: &'static str },

    /// Numeric value outside its inclusive range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} must be greater than 0")]
    NonPositiveId { field: &'static str },

    #[error("{field} must be a positive amount")]
    NotPositive { field: &'static str },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{what} is required")]
    Required { what: &'static str },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The addressed entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The request collides with existing state (duplicate email, active assignment).
    #[error("{0}")]
    Conflict(String),

    /// A field failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A business rule rejected otherwise well-formed input.
    #[error("{0}")]
    Rejected(String),

    /// The caller may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The visit is not in a state that allows the action.
    #[error("Cannot {action} a {current} visit")]
    InvalidTransition {
        current: VisitStatus,
        action: &'static str,
    },

    /// The zone directory rejected or could not verify a zone.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// The product catalog could not answer.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::UniqueViolation { .. } => DomainError::Conflict(e.to_string()),
            other => DomainError::Store(other),
        }
    }
}
