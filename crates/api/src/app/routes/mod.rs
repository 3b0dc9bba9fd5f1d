use axum::{Router, routing::get};

pub mod carts;
pub mod products;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/carts", carts::router())
        .nest("/users", users::router())
}
