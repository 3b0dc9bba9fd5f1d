//! Three-valued lookup outcome.

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

/// Outcome of resolving a raw reference to a record.
///
/// `NotFound` and `InvalidReference` must stay distinguishable: a well-formed
/// id with no record is a 404, a malformed id is a client error of a different
/// kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    InvalidReference(String),
}

impl<T> Lookup<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::InvalidReference(msg) => Lookup::InvalidReference(msg),
        }
    }

    /// Collapse into a `Result`, keeping the two failure kinds apart.
    pub fn into_result(self) -> DomainResult<T> {
        match self {
            Lookup::Found(v) => Ok(v),
            Lookup::NotFound => Err(DomainError::NotFound),
            Lookup::InvalidReference(msg) => Err(DomainError::InvalidReference(msg)),
        }
    }
}
