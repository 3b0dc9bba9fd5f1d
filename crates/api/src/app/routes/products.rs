use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_auth::Actor;
use storefront_products::{ProductForm, ProductView, RawProductQuery};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:pid", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RawProductQuery>,
) -> axum::response::Response {
    match services.catalog.list_products(query).await {
        Ok(page) => Json(page.map(|p| ProductView::from(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    match services.catalog.get_product(&pid).await {
        Ok(lookup) => errors::lookup_to_response(lookup, &format!("product '{pid}'"), |p| {
            Json(ProductView::from(&p)).into_response()
        }),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(form): Json<ProductForm>,
) -> axum::response::Response {
    match services.catalog.create_product(&actor, form).await {
        Ok(p) => (StatusCode::CREATED, Json(ProductView::from(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(pid): Path<String>,
    Json(form): Json<ProductForm>,
) -> axum::response::Response {
    match services.catalog.update_product(&actor, &pid, form).await {
        Ok(p) => Json(ProductView::from(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    let committed = match services.catalog.delete_product(&actor, &pid).await {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(e),
    };

    let (id, report) = committed.finish(services.notifier.as_ref()).await;
    Json(serde_json::json!({
        "id": id.to_string(),
        "notifications": dto::hooks_to_json(&report),
    }))
    .into_response()
}
