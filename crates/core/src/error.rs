//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// policy denials, conflicts). Storage and notification failures belong to the
/// infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (bad status encoding, non-numeric price, etc.).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed at all.
    ///
    /// Distinct from [`DomainError::NotFound`]: callers answer a malformed id
    /// differently from a well-formed id with no record behind it.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A syntactically valid reference with no matching record.
    #[error("not found")]
    NotFound,

    /// The actor is not permitted to perform the action.
    #[error("unauthorized")]
    Unauthorized,

    /// A versioned write lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::InvalidReference(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
