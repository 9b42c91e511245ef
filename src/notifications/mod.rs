pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::routing::{get, put};
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/:id/read",
            put(handlers::mark_notification_read),
        )
}
