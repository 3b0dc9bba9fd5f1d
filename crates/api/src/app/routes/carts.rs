use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_auth::Actor;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/:cid", get(get_cart))
        .route("/:cid/products/:pid", post(add_to_cart))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    match services.carts.get_cart(&actor, &cid).await {
        Ok(lookup) => errors::lookup_to_response(lookup, &format!("cart '{cid}'"), |cart| {
            Json(dto::CartView::from(&cart)).into_response()
        }),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path((cid, pid)): Path<(String, String)>,
    body: Option<Json<dto::AddToCartRequest>>,
) -> axum::response::Response {
    let quantity = body.and_then(|Json(b)| b.quantity).unwrap_or(1);
    match services.carts.add_to_cart(&actor, &cid, &pid, quantity).await {
        Ok(cart) => Json(dto::CartView::from(&cart)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
