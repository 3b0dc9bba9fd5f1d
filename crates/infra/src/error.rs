//! Service-level error taxonomy.
//!
//! Every service operation resolves to success or exactly one of these, so the
//! presentation layer can map outcomes one-to-one onto responses.

use thiserror::Error;

use storefront_auth::AuthzError;
use storefront_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A well-formed reference with no matching record.
    #[error("not found: {0}")]
    NotFound(String),

    /// A reference that could not be parsed.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Malformed or inconsistent input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The policy denied the action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Storage (or another collaborator) failed unexpectedly.
    #[error("dependency failure: {0}")]
    Dependency(String),
}

/// Log a policy denial and convert it.
pub(crate) fn denied(err: AuthzError) -> ServiceError {
    tracing::warn!("action denied: {err}");
    ServiceError::from(err)
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidReference(msg) => ServiceError::InvalidReference(msg),
            DomainError::NotFound => ServiceError::NotFound("record does not exist".to_string()),
            DomainError::Unauthorized => ServiceError::Unauthorized("unauthorized".to_string()),
            DomainError::Conflict(msg) => ServiceError::Dependency(msg),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Unauthorized(value.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Missing(what) => ServiceError::NotFound(format!("{what} does not exist")),
            other => {
                tracing::error!("storage failure: {other}");
                ServiceError::Dependency(other.to_string())
            }
        }
    }
}
