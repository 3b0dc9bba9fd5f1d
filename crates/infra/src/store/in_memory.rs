//! In-memory stores.
//!
//! Guards are never held across an await: every method takes the lock, does
//! its work synchronously and returns.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_auth::{Role, User};
use storefront_carts::Cart;
use storefront_core::{CartId, Entity, ExpectedVersion, ProductId, UserId};
use storefront_products::{PaginationResult, Product, ProductPatch, ProductQuery};

use super::{CartStore, ProductStore, StoreError, UserStore};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Entities keyed by their own id.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity + Clone> Table<E> {
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.write().map_err(poisoned)
    }

    /// Insert unless `clashes` matches an existing row.
    fn insert_unique(&self, entity: E, clashes: impl Fn(&E) -> Option<String>) -> Result<(), StoreError> {
        let mut rows = self.write()?;
        if let Some(what) = rows.values().find_map(&clashes) {
            return Err(StoreError::Duplicate(what));
        }
        rows.insert(entity.id().clone(), entity);
        Ok(())
    }

    fn get(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn update(&self, id: &E::Id, f: impl FnOnce(&mut E)) -> Result<Option<E>, StoreError> {
        let mut rows = self.write()?;
        Ok(rows.get_mut(id).map(|e| {
            f(e);
            e.clone()
        }))
    }

    fn remove(&self, id: &E::Id) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(id).is_some())
    }
}

// -------------------------
// Products
// -------------------------

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: Table<Product>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        let code = product.code.clone();
        self.products.insert_unique(product, |p| {
            (p.code == code).then(|| format!("product code '{code}'"))
        })
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.products.get(&id)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let products = self.products.read()?;
        Ok(products.values().find(|p| p.code == code).cloned())
    }

    async fn query(&self, query: &ProductQuery) -> Result<PaginationResult<Product>, StoreError> {
        let products = self.products.read()?;
        Ok(query.apply(products.values().cloned()))
    }

    async fn merge(&self, id: ProductId, patch: &ProductPatch) -> Result<Option<Product>, StoreError> {
        let mut products = self.products.write()?;
        if let Some(code) = &patch.code {
            if products.values().any(|p| p.id != id && &p.code == code) {
                return Err(StoreError::Duplicate(format!("product code '{code}'")));
            }
        }
        Ok(products.get_mut(&id).map(|p| {
            p.apply_patch(patch);
            p.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        self.products.remove(&id)
    }
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Table<User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        let email = user.email.clone();
        self.users.insert_unique(user, |u| {
            (u.email == email).then(|| format!("email '{email}'"))
        })
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.users.get(&id)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut out: Vec<User> = self.users.read()?.values().cloned().collect();
        out.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(out)
    }

    async fn inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError> {
        let mut out: Vec<User> = self
            .users
            .read()?
            .values()
            .filter(|u| u.is_inactive_since(cutoff))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.last_activity.cmp(&b.last_activity).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, StoreError> {
        self.users.update(&id, |u| u.role = role)
    }

    async fn touch(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self.users.update(&id, |u| u.touch(at))?.is_some())
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        self.users.remove(&id)
    }
}

// -------------------------
// Carts
// -------------------------

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: Table<Cart>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn create(&self, cart: Cart) -> Result<(), StoreError> {
        let id = cart.id;
        self.carts
            .insert_unique(cart, |c| (c.id == id).then(|| format!("cart {id}")))
    }

    async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        self.carts.get(&id)
    }

    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let mut carts = self.carts.write()?;
        let current = carts
            .get(&cart.id)
            .map(|c| c.version)
            .ok_or_else(|| StoreError::Missing(format!("cart {}", cart.id)))?;

        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "cart {} (expected: {expected:?}, actual: {current})",
                cart.id
            )));
        }

        let mut stored = cart.clone();
        stored.version = current + 1;
        carts.insert(stored.id, stored);
        Ok(current + 1)
    }

    async fn delete(&self, id: CartId) -> Result<bool, StoreError> {
        self.carts.remove(&id)
    }
}
