//! Router configuration for the catalog API.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/items", get(handlers::list_items))
        .route("/items", post(handlers::create_item))
        .route("/items/{id}", get(handlers::get_item))
        .route("/items/{id}", put(handlers::update_item))
        .route("/items/{id}", delete(handlers::delete_item))
        .with_state(state)
}
