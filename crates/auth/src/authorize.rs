use serde::Serialize;
use thiserror::Error;

use storefront_core::CartId;

use crate::{Action, Actor, Role};

/// A resource with a single owning user.
pub trait Owned {
    fn is_owned_by(&self, actor: &Actor) -> bool;
}

/// An owner email.
impl Owned for str {
    fn is_owned_by(&self, actor: &Actor) -> bool {
        actor.is_email(self)
    }
}

impl Owned for String {
    fn is_owned_by(&self, actor: &Actor) -> bool {
        actor.is_email(self)
    }
}

/// A cart belongs to the account it was created for.
impl Owned for CartId {
    fn is_owned_by(&self, actor: &Actor) -> bool {
        actor.cart_id == Some(*self)
    }
}

/// Why an action was permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// The actor's role alone permits the action.
    Role,
    /// The actor owns the resource and their role allows owners to act.
    Ownership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{email}' ({role}) may not perform '{action}'")]
    Forbidden {
        email: String,
        role: Role,
        action: Action,
    },
}

/// Decide whether `actor` may perform `action`.
///
/// `owner` is the target resource for product and cart actions and is ignored
/// for the others. Precedence:
///
/// 1. `Admin` is permitted for product actions; `Admin` and `SuperAdmin` for
///    user management and for reading any cart.
/// 2. `UserPremium` acting on a product they own is permitted to mutate/delete.
/// 3. Any actor may read and add to their own cart.
/// 4. Everything else is denied.
///
/// - No IO
/// - No panics
pub fn authorize<R: Owned + ?Sized>(
    actor: &Actor,
    action: Action,
    owner: Option<&R>,
) -> Result<Grant, AuthzError> {
    let owned = || owner.filter(|r| r.is_owned_by(actor)).map(|_| Grant::Ownership);
    let grant = match action {
        Action::CreateProduct => match actor.role {
            Role::Admin | Role::UserPremium => Some(Grant::Role),
            Role::Guest | Role::User | Role::SuperAdmin => None,
        },
        Action::MutateProduct | Action::DeleteProduct => match actor.role {
            Role::Admin => Some(Grant::Role),
            Role::UserPremium => owned(),
            Role::Guest | Role::User | Role::SuperAdmin => None,
        },
        Action::ManageUsers => match actor.role {
            Role::Admin | Role::SuperAdmin => Some(Grant::Role),
            Role::Guest | Role::User | Role::UserPremium => None,
        },
        Action::ReadCart => match actor.role {
            Role::Admin | Role::SuperAdmin => Some(Grant::Role),
            Role::Guest | Role::User | Role::UserPremium => owned(),
        },
        Action::ModifyCart => owned(),
    };

    grant.ok_or_else(|| AuthzError::Forbidden {
        email: actor.email.clone(),
        role: actor.role,
        action,
    })
}

pub fn can_create_product(actor: &Actor) -> bool {
    authorize::<str>(actor, Action::CreateProduct, None).is_ok()
}

pub fn can_mutate_product<R: Owned + ?Sized>(actor: &Actor, product: &R) -> bool {
    authorize(actor, Action::MutateProduct, Some(product)).is_ok()
}

pub fn can_delete_product<R: Owned + ?Sized>(actor: &Actor, product: &R) -> bool {
    authorize(actor, Action::DeleteProduct, Some(product)).is_ok()
}

pub fn can_manage_users(actor: &Actor) -> bool {
    authorize::<str>(actor, Action::ManageUsers, None).is_ok()
}

pub fn can_read_cart(actor: &Actor, cart: &CartId) -> bool {
    authorize(actor, Action::ReadCart, Some(cart)).is_ok()
}

pub fn can_modify_cart(actor: &Actor, cart: &CartId) -> bool {
    authorize(actor, Action::ModifyCart, Some(cart)).is_ok()
}
