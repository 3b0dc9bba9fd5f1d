//! Account administration.

use std::sync::Arc;

use storefront_auth::{Action, Actor, Grant, Role, User, UserSummary, authorize};
use storefront_carts::Cart;
use storefront_core::{CartId, Clock, Lookup, UserId};

use crate::error::{ServiceError, denied};
use crate::store::{CartStore, StoreError, UserStore};

#[derive(Clone)]
pub struct UserAdmin {
    users: Arc<dyn UserStore>,
    carts: Arc<dyn CartStore>,
    clock: Arc<dyn Clock>,
}

impl UserAdmin {
    pub fn new(users: Arc<dyn UserStore>, carts: Arc<dyn CartStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, carts, clock }
    }

    /// Fails with `Unauthorized` unless `actor` may manage accounts.
    pub fn require_manager(&self, actor: &Actor) -> Result<Grant, ServiceError> {
        authorize::<str>(actor, Action::ManageUsers, None).map_err(denied)
    }

    /// Create a customer account together with its empty cart.
    ///
    /// The cart is stored first; if the account insert then fails the cart is
    /// removed again, so no account ever points at a missing cart.
    pub async fn register(&self, email: &str, first_name: &str, last_name: &str) -> Result<User, ServiceError> {
        let cart_id = CartId::new();
        let user = User::register(UserId::new(), email, first_name, last_name, Role::User, self.clock.now())?
            .with_cart(cart_id);

        self.carts.create(Cart::empty(cart_id)).await?;
        if let Err(e) = self.users.insert(user.clone()).await {
            discard_cart(self.carts.as_ref(), cart_id).await;
            return Err(match e {
                StoreError::Duplicate(_) => {
                    ServiceError::Validation(format!("email '{}' is already registered", user.email))
                }
                other => other.into(),
            });
        }

        tracing::info!(user_id = %user.id, email = %user.email, "account registered");
        Ok(user)
    }

    pub async fn get_user(&self, raw_id: &str) -> Result<Lookup<User>, ServiceError> {
        let id = match raw_id.parse::<UserId>() {
            Ok(id) => id,
            Err(e) => return Ok(Lookup::InvalidReference(e.to_string())),
        };
        Ok(Lookup::from_option(self.users.get(id).await?))
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<UserSummary>, ServiceError> {
        self.require_manager(actor)?;
        let users = self.users.list().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Toggle an account between `User` and `UserPremium`.
    pub async fn change_role(&self, actor: &Actor, raw_id: &str) -> Result<User, ServiceError> {
        self.require_manager(actor)?;
        let user = self
            .get_user(raw_id)
            .await?
            .into_result()
            .map_err(|e| not_found_user(e.into(), raw_id))?;
        let role = user.toggled_role()?;

        let updated = self
            .users
            .set_role(user.id, role)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user '{raw_id}' does not exist")))?;
        tracing::info!(user_id = %updated.id, from = %user.role, to = %updated.role, actor = %actor.email, "role changed");
        Ok(updated)
    }

    pub async fn delete_user(&self, actor: &Actor, raw_id: &str) -> Result<UserId, ServiceError> {
        self.require_manager(actor)?;
        let id: UserId = raw_id.parse()?;
        if id == actor.id {
            return Err(ServiceError::Validation("administrators cannot delete their own account".into()));
        }

        let user = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user '{raw_id}' does not exist")))?;
        if !self.users.delete(id).await? {
            return Err(ServiceError::NotFound(format!("user '{raw_id}' does not exist")));
        }
        if let Some(cart_id) = user.cart_id {
            discard_cart(self.carts.as_ref(), cart_id).await;
        }
        tracing::info!(user_id = %id, actor = %actor.email, "account deleted");
        Ok(id)
    }

    /// Record activity for `id` at the current time.
    pub async fn touch(&self, id: UserId) -> Result<bool, ServiceError> {
        Ok(self.users.touch(id, self.clock.now()).await?)
    }
}

/// Remove a cart whose account is gone (or never got stored).
///
/// The account removal already succeeded at this point, so a failure here is
/// logged rather than returned.
pub(crate) async fn discard_cart(carts: &dyn CartStore, cart_id: CartId) {
    if let Err(e) = carts.delete(cart_id).await {
        tracing::error!(%cart_id, "failed to remove orphaned cart: {e}");
    }
}

fn not_found_user(err: ServiceError, raw_id: &str) -> ServiceError {
    match err {
        ServiceError::NotFound(_) => ServiceError::NotFound(format!("user '{raw_id}' does not exist")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;
    use storefront_core::ExpectedVersion;

    use crate::store::InMemoryCartStore;
    use crate::testing::{actor, admin, clock, premium, stores, t0};

    fn admin_service() -> UserAdmin {
        let s = stores();
        UserAdmin::new(s.users, s.carts, clock())
    }

    #[tokio::test]
    async fn register_creates_user_with_empty_cart() {
        let s = stores();
        let svc = UserAdmin::new(s.users.clone(), s.carts.clone(), clock());
        let u = svc.register("New@Shop.test", "Ada", "Lovelace").await.unwrap();

        assert_eq!(u.email, "new@shop.test");
        assert_eq!(u.role, Role::User);
        let cart = s.carts.get(u.cart_id.unwrap()).await.unwrap().unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            svc.register("new@shop.test", "Ada", "Again").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn only_managers_list_users() {
        let svc = admin_service();
        svc.register("a@shop.test", "A", "One").await.unwrap();

        let listed = svc.list_users(&admin()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "A One");

        assert!(svc.list_users(&actor(Role::SuperAdmin, "root@shop.test")).await.is_ok());
        assert!(matches!(
            svc.list_users(&premium("p@shop.test")).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn change_role_toggles_customer_tiers() {
        let svc = admin_service();
        let u = svc.register("a@shop.test", "A", "One").await.unwrap();
        let id = u.id.to_string();

        assert_eq!(svc.change_role(&admin(), &id).await.unwrap().role, Role::UserPremium);
        assert_eq!(svc.change_role(&admin(), &id).await.unwrap().role, Role::User);

        assert!(matches!(
            svc.change_role(&admin(), &UserId::new().to_string()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.change_role(&admin(), "bogus").await,
            Err(ServiceError::InvalidReference(_))
        ));
        assert!(matches!(
            svc.change_role(&premium("p@shop.test"), &id).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn delete_user_requires_manager_and_existing_other_account() {
        let s = stores();
        let svc = UserAdmin::new(s.users.clone(), s.carts.clone(), clock());
        let u = svc.register("a@shop.test", "A", "One").await.unwrap();
        let cart_id = u.cart_id.unwrap();
        let me = admin();

        assert!(matches!(
            svc.delete_user(&me, &me.id.to_string()).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.delete_user(&premium("p@shop.test"), &u.id.to_string()).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(svc.delete_user(&me, &u.id.to_string()).await.unwrap(), u.id);
        assert_eq!(s.carts.get(cart_id).await.unwrap(), None);
        assert!(matches!(
            svc.delete_user(&me, &u.id.to_string()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    /// Records created carts; optionally refuses to create any.
    struct FlakyCarts {
        inner: InMemoryCartStore,
        refuse_create: bool,
        created: Mutex<Vec<CartId>>,
    }

    impl FlakyCarts {
        fn new(refuse_create: bool) -> Self {
            Self { inner: InMemoryCartStore::new(), refuse_create, created: Mutex::new(Vec::new()) }
        }

        fn created(&self) -> Vec<CartId> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CartStore for FlakyCarts {
        async fn create(&self, cart: Cart) -> Result<(), StoreError> {
            if self.refuse_create {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.created.lock().unwrap().push(cart.id);
            self.inner.create(cart).await
        }

        async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
            self.inner.get(id).await
        }

        async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError> {
            self.inner.save(cart, expected).await
        }

        async fn delete(&self, id: CartId) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn failed_cart_creation_stores_no_account() {
        let s = stores();
        let svc = UserAdmin::new(s.users.clone(), Arc::new(FlakyCarts::new(true)), clock());

        assert!(matches!(
            svc.register("a@shop.test", "A", "One").await,
            Err(ServiceError::Dependency(_))
        ));
        assert!(s.users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_registration_leaves_no_cart_behind() {
        let s = stores();
        let carts = Arc::new(FlakyCarts::new(false));
        let svc = UserAdmin::new(s.users.clone(), carts.clone(), clock());

        let first = svc.register("a@shop.test", "A", "One").await.unwrap();
        assert!(matches!(
            svc.register("A@shop.test", "A", "Again").await,
            Err(ServiceError::Validation(_))
        ));

        let created = carts.created();
        assert_eq!(created.len(), 2);
        assert_eq!(Some(created[0]), first.cart_id);
        assert!(carts.get(created[0]).await.unwrap().is_some());
        assert_eq!(carts.get(created[1]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn touch_moves_last_activity_forward() {
        let s = stores();
        let old = User::register(UserId::new(), "idle@shop.test", "I", "Dle", Role::User, t0() - Duration::days(9))
            .unwrap();
        s.users.insert(old.clone()).await.unwrap();
        let svc = UserAdmin::new(s.users.clone(), s.carts, clock());

        assert!(svc.touch(old.id).await.unwrap());
        assert_eq!(s.users.get(old.id).await.unwrap().unwrap().last_activity, t0());
        assert!(!svc.touch(UserId::new()).await.unwrap());
    }
}
