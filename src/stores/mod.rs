pub mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/stores",
            get(handlers::list_stores).post(handlers::create_store),
        )
        .route(
            "/stores/:id",
            get(handlers::get_store)
                .put(handlers::update_store)
                .delete(handlers::delete_store),
        )
        .route("/stores/user/:user_id", get(handlers::get_store_by_user))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}
