//! Product lifecycle: list, look up, create, update and delete catalog entries.
//!
//! Update and delete always load the product first and check ownership
//! against the stored record, never against client input.
//!
//! Concurrent updates to the same product are not coordinated: each update is
//! a field-by-field merge and the last writer wins per field.

use std::sync::Arc;

use storefront_auth::{Action, Actor, Grant, authorize};
use storefront_core::{Clock, Lookup, ProductId};
use storefront_products::{PaginationResult, Product, ProductForm, ProductQuery, RawProductQuery};

use crate::error::{ServiceError, denied};
use crate::hooks::{Committed, PostCommitHooks};
use crate::notify::Notification;
use crate::store::{ProductStore, StoreError};

#[derive(Clone)]
pub struct ProductLifecycle {
    products: Arc<dyn ProductStore>,
    clock: Arc<dyn Clock>,
}

impl ProductLifecycle {
    pub fn new(products: Arc<dyn ProductStore>, clock: Arc<dyn Clock>) -> Self {
        Self { products, clock }
    }

    pub async fn list_products(&self, raw: RawProductQuery) -> Result<PaginationResult<Product>, ServiceError> {
        let query = ProductQuery::parse(raw)?;
        Ok(self.products.query(&query).await?)
    }

    pub async fn get_product(&self, raw_id: &str) -> Result<Lookup<Product>, ServiceError> {
        let id = match raw_id.parse::<ProductId>() {
            Ok(id) => id,
            Err(e) => return Ok(Lookup::InvalidReference(e.to_string())),
        };
        Ok(Lookup::from_option(self.products.get(id).await?))
    }

    async fn load(&self, raw_id: &str) -> Result<Product, ServiceError> {
        self.get_product(raw_id)
            .await?
            .into_result()
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::NotFound(_) => ServiceError::NotFound(format!("product '{raw_id}' does not exist")),
                other => other,
            })
    }

    pub async fn create_product(&self, actor: &Actor, form: ProductForm) -> Result<Product, ServiceError> {
        authorize::<str>(actor, Action::CreateProduct, None).map_err(denied)?;

        let fields = form.into_fields()?;
        if self.products.find_by_code(&fields.code).await?.is_some() {
            return Err(ServiceError::Validation(format!(
                "product code '{}' is already in use",
                fields.code
            )));
        }

        let product = Product::new(ProductId::new(), fields, actor.email.clone(), self.clock.now());
        self.products
            .insert(product.clone())
            .await
            .map_err(|e| duplicate_code(e, &product.code))?;

        tracing::info!(product_id = %product.id, owner = %product.owner, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        raw_id: &str,
        form: ProductForm,
    ) -> Result<Product, ServiceError> {
        let current = self.load(raw_id).await?;
        let grant = authorize(actor, Action::MutateProduct, Some(&current)).map_err(denied)?;

        let patch = form.into_patch()?;
        if let Some(code) = &patch.code {
            let taken = self
                .products
                .find_by_code(code)
                .await?
                .is_some_and(|other| other.id != current.id);
            if taken {
                return Err(ServiceError::Validation(format!("product code '{code}' is already in use")));
            }
        }

        let updated = self
            .products
            .merge(current.id, &patch)
            .await
            .map_err(|e| duplicate_code(e, patch.code.as_deref().unwrap_or_default()))?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{raw_id}' does not exist")))?;

        tracing::info!(product_id = %updated.id, actor = %actor.email, ?grant, "product updated");
        Ok(updated)
    }

    /// Delete a product. When a premium owner deletes their own product, a
    /// notification to them is queued on the result.
    pub async fn delete_product(&self, actor: &Actor, raw_id: &str) -> Result<Committed<ProductId>, ServiceError> {
        let product = self.load(raw_id).await?;
        let grant = authorize(actor, Action::DeleteProduct, Some(&product)).map_err(denied)?;

        if !self.products.delete(product.id).await? {
            return Err(ServiceError::NotFound(format!("product '{raw_id}' does not exist")));
        }
        tracing::info!(product_id = %product.id, actor = %actor.email, ?grant, "product deleted");

        let mut hooks = PostCommitHooks::new();
        match grant {
            Grant::Ownership => {
                hooks.notify(actor.email.clone(), Notification::product_deleted(product.id, &actor.email));
            }
            Grant::Role => {}
        }
        Ok(Committed::new(product.id, hooks))
    }
}

fn duplicate_code(err: StoreError, code: &str) -> ServiceError {
    match err {
        StoreError::Duplicate(_) => ServiceError::Validation(format!("product code '{code}' is already in use")),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storefront_auth::Role;
    use storefront_products::ProductPatch;

    use crate::notify::RecordingNotifier;
    use crate::store::InMemoryProductStore;
    use crate::testing::{actor, admin, clock, form, premium, stores};

    fn lifecycle() -> ProductLifecycle {
        ProductLifecycle::new(stores().products, clock())
    }

    #[tokio::test]
    async fn premium_create_sets_owner_from_actor() {
        let svc = lifecycle();
        let seller = premium("seller@shop.test");
        let p = svc.create_product(&seller, form("P-1", "12.50")).await.unwrap();
        assert_eq!(p.owner, "seller@shop.test");
        assert_eq!(p.price.minor_units(), 1250);
        assert!(p.status);
    }

    #[tokio::test]
    async fn plain_users_and_super_admins_cannot_create() {
        let svc = lifecycle();
        for role in [Role::Guest, Role::User, Role::SuperAdmin] {
            let err = svc
                .create_product(&actor(role, "x@shop.test"), form("P-1", "1"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(_)), "{role}");
        }
    }

    #[tokio::test]
    async fn create_validates_fields_and_unique_code() {
        let svc = lifecycle();
        let a = admin();
        svc.create_product(&a, form("P-1", "1")).await.unwrap();

        let dup = svc.create_product(&a, form("P-1", "2")).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Validation(_)));

        let mut bad = form("P-2", "1");
        bad.status = Some(serde_json::json!("maybe"));
        assert!(matches!(
            svc.create_product(&a, bad).await,
            Err(ServiceError::Validation(_))
        ));

        let missing = ProductForm { code: Some("P-3".into()), ..Default::default() };
        assert!(matches!(
            svc.create_product(&a, missing).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn malformed_and_absent_ids_are_distinguishable() {
        let svc = lifecycle();
        assert!(matches!(
            svc.get_product("not-a-uuid").await.unwrap(),
            Lookup::InvalidReference(_)
        ));
        assert_eq!(
            svc.get_product(&ProductId::new().to_string()).await.unwrap(),
            Lookup::NotFound
        );

        let p = svc.create_product(&admin(), form("P-1", "1")).await.unwrap();
        assert_eq!(svc.get_product(&p.id.to_string()).await.unwrap(), Lookup::Found(p));
    }

    #[tokio::test]
    async fn admin_may_mutate_and_delete_any_product() {
        let svc = lifecycle();
        let p = svc
            .create_product(&premium("seller@shop.test"), form("P-1", "1"))
            .await
            .unwrap();

        let patch = ProductForm { stock: Some(serde_json::json!(0)), ..Default::default() };
        let updated = svc.update_product(&admin(), &p.id.to_string(), patch).await.unwrap();
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.owner, "seller@shop.test");

        let committed = svc.delete_product(&admin(), &p.id.to_string()).await.unwrap();
        assert_eq!(committed.value, p.id);
        assert!(committed.hooks.is_empty());
    }

    #[tokio::test]
    async fn premium_non_owner_is_denied_without_mutation() {
        let svc = lifecycle();
        let p = svc
            .create_product(&premium("owner@shop.test"), form("P-1", "1"))
            .await
            .unwrap();
        let intruder = premium("other@shop.test");

        let patch = ProductForm { title: Some("Hijacked".into()), ..Default::default() };
        assert!(matches!(
            svc.update_product(&intruder, &p.id.to_string(), patch).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.delete_product(&intruder, &p.id.to_string()).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(svc.get_product(&p.id.to_string()).await.unwrap(), Lookup::Found(p));
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let svc = lifecycle();
        let owner = premium("owner@shop.test");
        let p = svc.create_product(&owner, form("P-1", "1")).await.unwrap();
        let patch = ProductForm {
            title: Some("Renamed".into()),
            price: Some(serde_json::json!(7.25)),
            ..Default::default()
        };

        let once = svc.update_product(&owner, &p.id.to_string(), patch.clone()).await.unwrap();
        let twice = svc.update_product(&owner, &p.id.to_string(), patch).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.title, "Renamed");
        assert_eq!(twice.code, "P-1");
    }

    #[tokio::test]
    async fn update_rejects_code_of_another_product() {
        let svc = lifecycle();
        let a = admin();
        let p = svc.create_product(&a, form("P-1", "1")).await.unwrap();
        svc.create_product(&a, form("P-2", "1")).await.unwrap();

        let patch = ProductForm { code: Some("P-2".into()), ..Default::default() };
        assert!(matches!(
            svc.update_product(&a, &p.id.to_string(), patch).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn premium_owner_delete_queues_one_notification_to_actor() {
        let svc = lifecycle();
        let owner = premium("owner@shop.test");
        let p = svc.create_product(&owner, form("P-1", "1")).await.unwrap();

        let committed = svc.delete_product(&owner, &p.id.to_string()).await.unwrap();
        assert_eq!(committed.hooks.len(), 1);

        let notifier = RecordingNotifier::new();
        let (_, report) = committed.finish(&notifier).await;
        assert_eq!(report.succeeded, 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "owner@shop.test");
        assert!(sent[0].1.body_lines.iter().any(|l| l.contains("owner@shop.test")));
        assert_eq!(svc.get_product(&p.id.to_string()).await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn listing_paginates_25_products_by_ten() {
        let svc = lifecycle();
        for i in 0..25 {
            svc.create_product(&admin(), form(&format!("P-{i}"), "1")).await.unwrap();
        }

        let page = |n: &str| RawProductQuery { page: Some(n.into()), ..Default::default() };
        let first = svc.list_products(page("1")).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert!(!first.has_prev_page);
        assert_eq!(first.next_page, Some(2));
        assert_eq!(first.next_link.as_deref(), Some("/products?page=2"));

        let last = svc.list_products(page("3")).await.unwrap();
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next_page);
        assert_eq!(last.next_link, None);

        let bad = RawProductQuery { limit: Some("zero".into()), ..Default::default() };
        assert!(matches!(svc.list_products(bad).await, Err(ServiceError::Validation(_))));
    }

    /// Reads work; every write after seeding fails.
    struct ReadOnlyProducts {
        inner: InMemoryProductStore,
    }

    #[async_trait]
    impl ProductStore for ReadOnlyProducts {
        async fn insert(&self, product: Product) -> Result<(), StoreError> {
            self.inner.insert(product).await
        }
        async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
            self.inner.get(id).await
        }
        async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
            self.inner.find_by_code(code).await
        }
        async fn query(&self, query: &ProductQuery) -> Result<PaginationResult<Product>, StoreError> {
            self.inner.query(query).await
        }
        async fn merge(&self, _: ProductId, _: &ProductPatch) -> Result<Option<Product>, StoreError> {
            Err(StoreError::Backend("read-only replica".into()))
        }
        async fn delete(&self, _: ProductId) -> Result<bool, StoreError> {
            Err(StoreError::Backend("read-only replica".into()))
        }
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_dependency_without_side_effects() {
        let store = Arc::new(ReadOnlyProducts { inner: InMemoryProductStore::new() });
        let svc = ProductLifecycle::new(store, clock());
        let owner = premium("owner@shop.test");
        let p = svc.create_product(&owner, form("P-1", "1")).await.unwrap();
        let id = p.id.to_string();

        let patch = ProductForm { title: Some("Renamed".into()), ..Default::default() };
        assert!(matches!(
            svc.update_product(&owner, &id, patch).await,
            Err(ServiceError::Dependency(_))
        ));

        // An owner delete would queue a notice; a failed one yields no Committed at all.
        assert!(matches!(
            svc.delete_product(&owner, &id).await,
            Err(ServiceError::Dependency(_))
        ));
        assert_eq!(svc.get_product(&id).await.unwrap(), Lookup::Found(p));
    }
}
