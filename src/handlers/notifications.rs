use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::db::{notifications, try_lock};
use crate::response::{ok, ok_message, ApiResult, AppError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NotificationQuery {
  #[serde(default)]
  pub unread_only: bool,
}

/// GET /api/notifications?unread_only=
pub async fn list_notifications(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<NotificationQuery>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(notifications::list_notifications(
    &conn,
    auth.user_id,
    query.unread_only,
    Utc::now(),
  )?))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let count = notifications::unread_count(&conn, auth.user_id, Utc::now())?;
  Ok(ok(json!({ "count": count })))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(notification_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  if !notifications::mark_read(&conn, auth.user_id, notification_id)? {
    return Err(AppError::not_found("Notification not found"));
  }
  Ok(ok_message("Notification marked as read", json!({ "id": notification_id })))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let updated = notifications::mark_all_read(&conn, auth.user_id)?;
  Ok(ok_message("All notifications marked as read", json!({ "updated": updated })))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(notification_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  if !notifications::delete_notification(&conn, auth.user_id, notification_id)? {
    return Err(AppError::not_found("Notification not found"));
  }
  Ok(ok_message("Notification deleted", json!({ "id": notification_id })))
}
