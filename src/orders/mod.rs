pub mod dto;
pub mod handlers;
pub mod repo;
pub mod service;
pub mod status;

use crate::state::AppState;
use axum::routing::{get, post, put};
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(handlers::my_orders))
        .route("/orders/store", get(handlers::store_orders))
        .route("/orders/checkout", post(handlers::checkout))
        .route("/orders/partial-checkout", post(handlers::partial_checkout))
        .route("/orders/:id", get(handlers::get_order))
        .route("/orders/:id/cancel", post(handlers::cancel_order))
        .route("/orders/:id/status", put(handlers::update_status))
}
