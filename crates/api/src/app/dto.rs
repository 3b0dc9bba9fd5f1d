//! Request/response DTOs and JSON mapping helpers.

use serde::{Deserialize, Serialize};

use storefront_auth::{Actor, User};
use storefront_carts::Cart;
use storefront_infra::{HookReport, ReapReport};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddToCartRequest {
    /// Defaults to a single unit.
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StaleSweepParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LineItemView {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: String,
    pub items: Vec<LineItemView>,
    pub is_empty: bool,
    pub total_units: u64,
    pub version: u64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id.to_string(),
            items: cart
                .items()
                .iter()
                .map(|i| LineItemView {
                    product_id: i.product_id.to_string(),
                    quantity: i.quantity.get(),
                })
                .collect(),
            is_empty: cart.is_empty(),
            total_units: cart.total_units(),
            version: cart.version,
        }
    }
}

pub fn actor_to_json(actor: &Actor) -> serde_json::Value {
    serde_json::json!({
        "id": actor.id.to_string(),
        "email": actor.email,
        "role": actor.role.as_str(),
        "cart_id": actor.cart_id.map(|c| c.to_string()),
    })
}

pub fn user_to_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id.to_string(),
        "email": user.email,
        "name": user.full_name(),
        "role": user.role.as_str(),
        "cart_id": user.cart_id.map(|c| c.to_string()),
        "last_activity": user.last_activity,
    })
}

pub fn hooks_to_json(report: &HookReport) -> serde_json::Value {
    serde_json::json!({
        "attempted": report.attempted,
        "succeeded": report.succeeded,
        "failed": report.failed,
    })
}

pub fn reap_to_json(report: &ReapReport, threshold_days: u32) -> serde_json::Value {
    serde_json::json!({
        "deleted": report.deleted,
        "failed": report.failed,
        "threshold_days": threshold_days,
        "notifications": hooks_to_json(&report.notifications),
    })
}
