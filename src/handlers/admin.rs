//! Admin-only endpoints: user roles, system statistics, badge definitions.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::Pagination;
use crate::auth::db as auth_db;
use crate::auth::AdminContext;
use crate::db::{badges, stats, try_lock};
use crate::domain::{BadgeCondition, Role};
use crate::response::{ok, ApiResult, AppError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RoleRequest {
  pub role: String,
}

/// Partial badge update; missing fields keep their value
#[derive(Deserialize)]
pub struct BadgeUpdateRequest {
  pub name: Option<String>,
  pub description: Option<String>,
  pub icon: Option<String>,
  pub category: Option<String>,
  pub condition: Option<BadgeCondition>,
  pub threshold: Option<i64>,
  pub xp_reward: Option<i64>,
}

/// GET /api/admin/users?page=&limit=
pub async fn list_users(
  State(state): State<AppState>,
  _admin: AdminContext,
  Query(page): Query<Pagination>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let users = auth_db::list_users(&conn, page.limit(), page.offset())?;
  let total = auth_db::get_user_count(&conn)?;
  Ok(ok(json!({
    "users": users,
    "total": total,
    "page": page.page(),
    "limit": page.limit(),
  })))
}

/// PUT /api/admin/users/{id}/role
///
/// Admins cannot change their own role, so at least one admin always remains.
pub async fn set_role(
  State(state): State<AppState>,
  AdminContext(admin): AdminContext,
  Path(user_id): Path<i64>,
  Json(req): Json<RoleRequest>,
) -> ApiResult {
  let role = Role::from_str(&req.role).ok_or_else(|| AppError::validation("role must be user or admin"))?;
  if user_id == admin.user_id {
    return Err(AppError::bad_request("You cannot change your own role"));
  }

  let conn = try_lock(&state.db)?;
  if !auth_db::set_user_role(&conn, user_id, role)? {
    return Err(AppError::not_found("User not found"));
  }
  tracing::info!(admin_id = admin.user_id, user_id, role = role.as_str(), "Changed user role");
  let user = auth_db::get_user(&conn, user_id)?.ok_or_else(|| AppError::not_found("User not found"))?;
  Ok(ok(user))
}

/// GET /api/admin/stats
pub async fn system_stats(State(state): State<AppState>, _admin: AdminContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(stats::system_stats(&conn, Utc::now().date_naive())?))
}

/// PUT /api/admin/badges/{id}
pub async fn update_badge(
  State(state): State<AppState>,
  AdminContext(admin): AdminContext,
  Path(badge_id): Path<String>,
  Json(req): Json<BadgeUpdateRequest>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let mut badge = badges::get_badge(&conn, &badge_id)?.ok_or_else(|| AppError::not_found("Badge not found"))?;

  let non_blank = |field: &str, value: Option<String>| -> Result<Option<String>, AppError> {
    match value.map(|v| v.trim().to_string()) {
      Some(v) if v.is_empty() => Err(AppError::validation(format!("{field} must not be empty"))),
      other => Ok(other),
    }
  };
  if let Some(name) = non_blank("name", req.name)? {
    badge.name = name;
  }
  if let Some(description) = non_blank("description", req.description)? {
    badge.description = description;
  }
  if let Some(icon) = non_blank("icon", req.icon)? {
    badge.icon = icon;
  }
  if let Some(category) = non_blank("category", req.category)? {
    badge.category = category;
  }
  if let Some(condition) = req.condition {
    badge.condition = condition;
  }
  if let Some(threshold) = req.threshold {
    if threshold < 1 {
      return Err(AppError::validation("threshold must be at least 1"));
    }
    badge.threshold = threshold;
  }
  if let Some(xp_reward) = req.xp_reward {
    if xp_reward < 0 {
      return Err(AppError::validation("xp_reward must not be negative"));
    }
    badge.xp_reward = xp_reward;
  }

  badges::update_badge(&conn, &badge)?;
  tracing::info!(admin_id = admin.user_id, badge = %badge.id, "Updated badge");
  Ok(ok(badge))
}
