//! User account model.
//!
//! Accounts are created at registration, have their role toggled by
//! administrators, and are removed either by an administrator or by the stale
//! account reaper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CartId, DomainError, DomainResult, Entity, UserId};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A registered account.
///
/// # Invariants
/// - `email` is trimmed, lowercased and contains an `@`.
/// - Only `role` and `last_activity` change after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub cart_id: Option<CartId>,
    pub last_activity: DateTime<Utc>,
}

impl User {
    pub fn register(
        id: UserId,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        Ok(Self {
            id,
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role,
            cart_id: None,
            last_activity: now,
        })
    }

    pub fn with_cart(mut self, cart_id: CartId) -> Self {
        self.cart_id = Some(cart_id);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// True when the last recorded activity is strictly before `cutoff`.
    pub fn is_inactive_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity < cutoff
    }

    /// Role this account moves to on an administrator's role change.
    ///
    /// Only the two customer tiers toggle; administrative and guest accounts
    /// are not changed this way.
    pub fn toggled_role(&self) -> DomainResult<Role> {
        match self.role {
            Role::User => Ok(Role::UserPremium),
            Role::UserPremium => Ok(Role::User),
            Role::Guest | Role::Admin | Role::SuperAdmin => Err(DomainError::validation(format!(
                "role {} cannot be toggled",
                self.role
            ))),
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_activity {
            self.last_activity = at;
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary DTO
// ─────────────────────────────────────────────────────────────────────────────

/// Reduced view of an account for administrative listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
