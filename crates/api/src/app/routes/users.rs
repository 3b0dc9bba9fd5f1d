use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};

use storefront_auth::Actor;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/inactive", delete(delete_inactive_users))
        .route("/:uid", delete(delete_user))
        .route("/:uid/role", put(change_role))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    match services
        .users
        .register(&body.email, &body.first_name, &body.last_name)
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> axum::response::Response {
    match services.users.list_users(&actor).await {
        Ok(users) => Json(users).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    match services.users.change_role(&actor, &uid).await {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    match services.users.delete_user(&actor, &uid).await {
        Ok(id) => Json(serde_json::json!({ "id": id.to_string() })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Reap accounts idle longer than `?days=` (or the configured threshold).
pub async fn delete_inactive_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<dto::StaleSweepParams>,
) -> axum::response::Response {
    if let Err(e) = services.users.require_manager(&actor) {
        return errors::service_error_to_response(e);
    }

    let days = params.days.unwrap_or(services.stale_account_days);
    let report = match services.reaper.sweep(days).await {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e),
    };

    if report.deleted == 0 {
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "nothing_reaped",
            format!("no inactive accounts could be removed (threshold: {days} days)"),
        );
    }
    Json(dto::reap_to_json(&report, days)).into_response()
}
