use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use storefront_auth::Actor;

use crate::app::dto;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(actor): Extension<Actor>) -> impl IntoResponse {
    Json(dto::actor_to_json(&actor))
}
