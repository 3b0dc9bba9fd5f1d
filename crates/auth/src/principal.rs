use serde::{Deserialize, Serialize};

use storefront_core::{CartId, UserId};

use crate::Role;

/// The authenticated user performing an operation.
///
/// Supplied by the session layer and passed explicitly into every policy and
/// lifecycle call; nothing in the core reads it from ambient request state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub cart_id: Option<CartId>,
}

impl Actor {
    pub fn new(id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
            cart_id: None,
        }
    }

    pub fn with_cart(mut self, cart_id: CartId) -> Self {
        self.cart_id = Some(cart_id);
        self
    }

    /// Email comparison used for ownership checks (trimmed, ASCII case-insensitive).
    pub fn is_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}
