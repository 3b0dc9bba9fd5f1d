//! Cart aggregation.
//!
//! Only the cart's holder may add to it; administrators may also read it.
//! Saves are versioned: the aggregator re-reads and re-applies the addition
//! when another writer got there first, up to [`MAX_SAVE_ATTEMPTS`] times.

use std::sync::Arc;

use storefront_auth::{Action, Actor, authorize};
use storefront_carts::{Cart, Quantity};
use storefront_core::{CartId, ExpectedVersion, Lookup, ProductId};

use crate::error::{ServiceError, denied};
use crate::store::{CartStore, ProductStore, StoreError};

pub const MAX_SAVE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct CartAggregator {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
}

impl CartAggregator {
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductStore>) -> Self {
        Self { carts, products }
    }

    /// A denial is reported before the store is consulted, so it never
    /// reveals whether the cart exists.
    pub async fn get_cart(&self, actor: &Actor, raw_id: &str) -> Result<Lookup<Cart>, ServiceError> {
        let id = match raw_id.parse::<CartId>() {
            Ok(id) => id,
            Err(e) => return Ok(Lookup::InvalidReference(e.to_string())),
        };
        authorize(actor, Action::ReadCart, Some(&id)).map_err(denied)?;
        Ok(Lookup::from_option(self.carts.get(id).await?))
    }

    /// Add `quantity` units of a listed product to a cart.
    ///
    /// Stock is neither checked nor decremented.
    pub async fn add_to_cart(
        &self,
        actor: &Actor,
        raw_cart_id: &str,
        raw_product_id: &str,
        quantity: i64,
    ) -> Result<Cart, ServiceError> {
        let quantity = Quantity::try_from(quantity)?;
        let cart_id: CartId = raw_cart_id.parse()?;
        let product_id: ProductId = raw_product_id.parse()?;
        authorize(actor, Action::ModifyCart, Some(&cart_id)).map_err(denied)?;

        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{product_id}' does not exist")))?;
        if !product.is_listed() {
            return Err(ServiceError::Validation(format!(
                "product '{product_id}' is not available"
            )));
        }

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut cart = self
                .carts
                .get(cart_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("cart '{cart_id}' does not exist")))?;
            cart.add(product_id, quantity)?;

            match self.carts.save(&cart, ExpectedVersion::Exact(cart.version)).await {
                Ok(version) => {
                    cart.version = version;
                    tracing::info!(%cart_id, %product_id, quantity = quantity.get(), "added to cart");
                    return Ok(cart);
                }
                Err(StoreError::Conflict(msg)) => {
                    tracing::warn!("cart save conflict (attempt {attempt}/{MAX_SAVE_ATTEMPTS}): {msg}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Dependency(format!(
            "cart '{cart_id}' kept changing; gave up after {MAX_SAVE_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_carts::LineItem;

    use crate::catalog::ProductLifecycle;
    use crate::store::{InMemoryCartStore, InMemoryProductStore};
    use crate::testing::{actor, admin, clock, form};
    use storefront_auth::Role;

    fn holder(cart_id: CartId) -> Actor {
        actor(Role::User, "buyer@shop.test").with_cart(cart_id)
    }

    struct Fixture {
        carts: Arc<InMemoryCartStore>,
        products: Arc<InMemoryProductStore>,
        cart_id: CartId,
    }

    async fn fixture() -> Fixture {
        let carts = Arc::new(InMemoryCartStore::new());
        let cart_id = CartId::new();
        carts.create(Cart::empty(cart_id)).await.unwrap();
        Fixture {
            carts,
            products: Arc::new(InMemoryProductStore::new()),
            cart_id,
        }
    }

    async fn listed_product(products: &Arc<InMemoryProductStore>, code: &str, listed: bool) -> ProductId {
        let catalog = ProductLifecycle::new(products.clone(), clock());
        let mut f = form(code, "3");
        f.status = Some(serde_json::json!(listed.to_string()));
        catalog.create_product(&admin(), f).await.unwrap().id
    }

    #[tokio::test]
    async fn adding_one_then_two_yields_single_line_of_three() {
        let fx = fixture().await;
        let p = listed_product(&fx.products, "P-1", true).await;
        let svc = CartAggregator::new(fx.carts.clone(), fx.products.clone());
        let (cid, pid) = (fx.cart_id.to_string(), p.to_string());
        let me = holder(fx.cart_id);

        svc.add_to_cart(&me, &cid, &pid, 1).await.unwrap();
        let cart = svc.add_to_cart(&me, &cid, &pid, 2).await.unwrap();

        assert_eq!(
            cart.items(),
            &[LineItem { product_id: p, quantity: Quantity::new(3).unwrap() }]
        );
        assert_eq!(cart.version, 2);
        assert_eq!(svc.get_cart(&me, &cid).await.unwrap(), Lookup::Found(cart));
    }

    #[tokio::test]
    async fn rejects_bad_quantity_unlisted_product_and_missing_records() {
        let fx = fixture().await;
        let listed = listed_product(&fx.products, "P-1", true).await;
        let hidden = listed_product(&fx.products, "P-2", false).await;
        let svc = CartAggregator::new(fx.carts.clone(), fx.products.clone());
        let cid = fx.cart_id.to_string();
        let me = holder(fx.cart_id);

        assert!(matches!(
            svc.add_to_cart(&me, &cid, &listed.to_string(), 0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.add_to_cart(&me, &cid, &hidden.to_string(), 1).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.add_to_cart(&me, &cid, &ProductId::new().to_string(), 1).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.add_to_cart(&me, "cart?", &listed.to_string(), 1).await,
            Err(ServiceError::InvalidReference(_))
        ));

        let cart = svc.get_cart(&me, &cid).await.unwrap().found().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn holder_of_a_vanished_cart_gets_not_found() {
        let fx = fixture().await;
        let p = listed_product(&fx.products, "P-1", true).await;
        let gone = CartId::new();
        let svc = CartAggregator::new(fx.carts, fx.products);

        assert!(matches!(
            svc.add_to_cart(&holder(gone), &gone.to_string(), &p.to_string(), 1).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(svc.get_cart(&holder(gone), &gone.to_string()).await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn strangers_cannot_read_or_fill_someone_elses_cart() {
        let fx = fixture().await;
        let p = listed_product(&fx.products, "P-1", true).await;
        let svc = CartAggregator::new(fx.carts.clone(), fx.products.clone());
        let cid = fx.cart_id.to_string();
        let stranger = actor(Role::User, "stranger@shop.test").with_cart(CartId::new());

        assert!(matches!(
            svc.add_to_cart(&stranger, &cid, &p.to_string(), 5).await,
            Err(ServiceError::Unauthorized(_))
        ));
        // Denied before the product is looked up.
        assert!(matches!(
            svc.add_to_cart(&stranger, &cid, &ProductId::new().to_string(), 1).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.get_cart(&stranger, &cid).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.add_to_cart(&admin(), &cid, &p.to_string(), 1).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let seen_by_admin = svc.get_cart(&admin(), &cid).await.unwrap().found().unwrap();
        assert!(seen_by_admin.is_empty());
        assert_eq!(fx.carts.get(fx.cart_id).await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn get_cart_distinguishes_malformed_from_absent() {
        let fx = fixture().await;
        let svc = CartAggregator::new(fx.carts, fx.products);
        assert!(matches!(svc.get_cart(&admin(), "nope").await.unwrap(), Lookup::InvalidReference(_)));
        assert_eq!(svc.get_cart(&admin(), &CartId::new().to_string()).await.unwrap(), Lookup::NotFound);
    }

    /// Loses the first `conflicts` saves to a simulated concurrent writer.
    struct ContendedCarts {
        inner: InMemoryCartStore,
        conflicts: AtomicUsize,
    }

    #[async_trait]
    impl CartStore for ContendedCarts {
        async fn create(&self, cart: Cart) -> Result<(), StoreError> {
            self.inner.create(cart).await
        }

        async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
            self.inner.get(id).await
        }

        async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                let mut bumped = self.inner.get(cart.id).await?.unwrap_or_else(|| Cart::empty(cart.id));
                let at = bumped.version;
                bumped.add(ProductId::new(), Quantity::ONE).ok();
                self.inner.save(&bumped, ExpectedVersion::Exact(at)).await?;
            }
            self.inner.save(cart, expected).await
        }

        async fn delete(&self, id: CartId) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    async fn contended(conflicts: usize) -> (CartAggregator, CartId, ProductId) {
        let products = Arc::new(InMemoryProductStore::new());
        let p = listed_product(&products, "P-1", true).await;
        let carts = ContendedCarts { inner: InMemoryCartStore::new(), conflicts: AtomicUsize::new(conflicts) };
        let cart_id = CartId::new();
        carts.create(Cart::empty(cart_id)).await.unwrap();
        (CartAggregator::new(Arc::new(carts), products), cart_id, p)
    }

    #[tokio::test]
    async fn concurrent_writes_are_retried_without_losing_updates() {
        let (svc, cid, p) = contended(2).await;
        let cart = svc.add_to_cart(&holder(cid), &cid.to_string(), &p.to_string(), 4).await.unwrap();

        assert_eq!(cart.quantity_of(&p), Some(Quantity::new(4).unwrap()));
        // Two interleaved writers each added their own line.
        assert_eq!(cart.items().len(), 3);
    }

    /// Drops the cart right before the first save lands.
    struct VanishingCarts {
        inner: InMemoryCartStore,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl CartStore for VanishingCarts {
        async fn create(&self, cart: Cart) -> Result<(), StoreError> {
            self.inner.create(cart).await
        }

        async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
            self.inner.get(id).await
        }

        async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(cart.id).await?;
            self.inner.save(cart, expected).await
        }

        async fn delete(&self, id: CartId) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn cart_deleted_mid_add_is_not_found_without_retrying() {
        let products = Arc::new(InMemoryProductStore::new());
        let p = listed_product(&products, "P-1", true).await;
        let carts = Arc::new(VanishingCarts { inner: InMemoryCartStore::new(), saves: AtomicUsize::new(0) });
        let cid = CartId::new();
        carts.create(Cart::empty(cid)).await.unwrap();
        let svc = CartAggregator::new(carts.clone(), products);

        assert!(matches!(
            svc.add_to_cart(&holder(cid), &cid.to_string(), &p.to_string(), 1).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(carts.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistent_contention_is_a_dependency_failure() {
        let (svc, cid, p) = contended(MAX_SAVE_ATTEMPTS).await;
        assert!(matches!(
            svc.add_to_cart(&holder(cid), &cid.to_string(), &p.to_string(), 1).await,
            Err(ServiceError::Dependency(_))
        ));
    }
}
