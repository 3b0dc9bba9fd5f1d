//! `storefront-auth` — pure authorization boundary.
//!
//! Roles, the authenticated actor, the ownership policy and session claims.
//! This crate is intentionally decoupled from HTTP and storage.

pub mod actions;
pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;
pub mod user;

pub use actions::Action;
pub use authorize::{
    authorize, can_create_product, can_delete_product, can_manage_users, can_modify_cart,
    can_mutate_product, can_read_cart, AuthzError, Grant, Owned,
};
pub use claims::{Hs256JwtValidator, JwtValidator, SessionClaims, TokenValidationError, validate_claims};
pub use principal::Actor;
pub use roles::Role;
pub use user::{User, UserSummary};
