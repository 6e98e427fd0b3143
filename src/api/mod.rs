//! HTTP API server

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

/// Build the API router using the provided application state.
///
/// Anything not matched by the item routes, including an unsupported method
/// on a known path, falls through to a JSON 404.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/items",
            get(handlers::list_items)
                .post(handlers::create_item)
                .fallback(handlers::not_found),
        )
        .route(
            "/items/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item)
                .fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
