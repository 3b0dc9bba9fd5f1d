//! Shared fixtures for service tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use storefront_auth::{Actor, Role};
use storefront_core::{FixedClock, UserId};
use storefront_products::ProductForm;

use crate::store::{InMemoryCartStore, InMemoryProductStore, InMemoryUserStore};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(t0()))
}

pub fn actor(role: Role, email: &str) -> Actor {
    Actor::new(UserId::new(), email, role)
}

pub fn admin() -> Actor {
    actor(Role::Admin, "admin@shop.test")
}

pub fn premium(email: &str) -> Actor {
    actor(Role::UserPremium, email)
}

pub fn form(code: &str, price: &str) -> ProductForm {
    ProductForm {
        title: Some(format!("Product {code}")),
        description: Some("test product".into()),
        price: Some(json!(price)),
        thumbnails: None,
        code: Some(code.into()),
        stock: Some(json!(10)),
        status: Some(json!("true")),
        category: Some("tools".into()),
    }
}

pub struct Stores {
    pub products: Arc<InMemoryProductStore>,
    pub users: Arc<InMemoryUserStore>,
    pub carts: Arc<InMemoryCartStore>,
}

pub fn stores() -> Stores {
    Stores {
        products: Arc::new(InMemoryProductStore::new()),
        users: Arc::new(InMemoryUserStore::new()),
        carts: Arc::new(InMemoryCartStore::new()),
    }
}
