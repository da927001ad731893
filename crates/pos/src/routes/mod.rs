//! Route handlers for the POS JSON API.
//!
//! Handlers are thin: they lock the register session, call into the engine,
//! and serialize view structs. Domain rules live in the engine modules, never
//! here.

pub mod cart;
pub mod checkout;
pub mod items;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

/// Build the `/api` router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(items::list))
        .route("/api/items/hidden", get(items::hidden))
        .route("/api/items/refresh", post(items::refresh))
        .route("/api/items/{id}/visibility", put(items::set_visibility))
        .route("/api/items/{id}", patch(items::update))
        .route("/api/cart", get(cart::show).delete(cart::clear))
        .route("/api/cart/select", post(cart::select))
        .route("/api/cart/lines", post(cart::add))
        .route(
            "/api/cart/lines/{id}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/api/checkout", post(checkout::submit))
        .route("/api/checkout/ack", post(checkout::acknowledge))
        .route("/api/history", get(checkout::history))
}
