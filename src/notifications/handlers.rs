use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::{ok, ApiError, ApiResult};
use crate::notifications::repo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread_only: bool,
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(params): Query<NotificationParams>,
) -> ApiResult<impl IntoResponse> {
    let rows = repo::list_for_user(&state.db, who.user_id, params.unread_only).await?;
    Ok(ok(rows, "Notifications retrieved"))
}

#[instrument(skip(state))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = repo::mark_read(&state.db, id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;
    Ok(ok(row, "Notification marked as read"))
}
