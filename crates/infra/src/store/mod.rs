//! Storage collaborators.
//!
//! The lifecycle services only see these traits. Two backends ship with the
//! workspace: [`in_memory`] (default, tests) and [`postgres`].

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_auth::{Role, User};
use storefront_carts::Cart;
use storefront_core::{CartId, ExpectedVersion, ProductId, UserId};
use storefront_products::{PaginationResult, Product, ProductPatch, ProductQuery};

pub use in_memory::{InMemoryCartStore, InMemoryProductStore, InMemoryUserStore};
pub use postgres::{PostgresCartStore, PostgresProductStore, PostgresUserStore, ensure_schema};

/// Storage error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A versioned write lost a race with another writer.
    #[error("version conflict: {0}")]
    Conflict(String),
    /// A uniqueness constraint was violated.
    #[error("duplicate: {0}")]
    Duplicate(String),
    /// A write addressed a record that does not exist.
    #[error("missing: {0}")]
    Missing(String),
    #[error("storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a new product. Fails with `Duplicate` if the code is taken.
    async fn insert(&self, product: Product) -> Result<(), StoreError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    /// Filter, order and paginate the catalog per [`ProductQuery`].
    async fn query(&self, query: &ProductQuery) -> Result<PaginationResult<Product>, StoreError>;

    /// Merge `patch` into the stored product and return the result, or `None`
    /// if the product no longer exists.
    async fn merge(&self, id: ProductId, patch: &ProductPatch) -> Result<Option<Product>, StoreError>;

    /// Returns whether a product was removed.
    async fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// All accounts, ordered by email.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Accounts whose last activity is strictly before `cutoff`.
    async fn inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError>;

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, StoreError>;

    /// Record activity at `at`. Never moves the timestamp backwards.
    async fn touch(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Remove an account. The Postgres backend drops the account's cart in
    /// the same transaction.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn create(&self, cart: Cart) -> Result<(), StoreError>;

    async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError>;

    /// Persist `cart` if the stored version matches `expected`; returns the new
    /// version. Fails with `Missing` if the cart does not exist.
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError>;

    async fn delete(&self, id: CartId) -> Result<bool, StoreError>;
}
