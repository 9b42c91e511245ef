pub mod dto;
pub mod handlers;
pub mod repo;
pub mod service;

use crate::state::AppState;
use axum::routing::{delete, get, post, put};
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/carts", get(handlers::list_carts))
        .route("/carts/add-item", post(handlers::add_item))
        .route("/carts/update-item/:item_id", put(handlers::update_item))
        .route("/carts/remove-item/:item_id", delete(handlers::remove_item))
        .route("/carts/clear/:cart_id", delete(handlers::clear_cart))
}
