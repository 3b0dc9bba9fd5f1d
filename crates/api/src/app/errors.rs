use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::Lookup;
use storefront_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::InvalidReference(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::Unauthorized(msg) => json_error(StatusCode::FORBIDDEN, "unauthorized", msg),
        ServiceError::Dependency(msg) => {
            tracing::error!("request failed on a dependency: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "dependency_failure", "something went wrong")
        }
    }
}

/// Map a three-way lookup: found values go through `found`, the two failure
/// kinds keep distinct responses.
pub fn lookup_to_response<T>(
    lookup: Lookup<T>,
    what: &str,
    found: impl FnOnce(T) -> axum::response::Response,
) -> axum::response::Response {
    match lookup {
        Lookup::Found(v) => found(v),
        Lookup::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} does not exist")),
        Lookup::InvalidReference(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
