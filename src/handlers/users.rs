//! Profile, password, statistics and leaderboard.

use axum::{
  extract::{Query, State},
  Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::db as auth_db;
use crate::auth::handlers::{is_valid_display_name, MAX_DISPLAY_NAME_LEN};
use crate::auth::{password, AuthContext};
use crate::db::{stats, try_lock};
use crate::domain::{Preferences, ProgressOverview, User};
use crate::response::{ok, ok_message, ApiResult, AppError};
use crate::services::learning;
use crate::state::AppState;

pub const DEFAULT_STATS_DAYS: i64 = 30;
pub const MAX_STATS_DAYS: i64 = 365;
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
pub const MAX_LEADERBOARD_SIZE: i64 = 100;
pub const MAX_DAILY_GOAL: i64 = 500;

#[derive(Serialize)]
pub struct Profile {
  pub user: User,
  pub overview: ProgressOverview,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
  pub display_name: Option<String>,
  pub preferences: Option<Preferences>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
  pub current_password: String,
  pub new_password: String,
}

#[derive(Deserialize)]
pub struct StatsQuery {
  pub days: Option<i64>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
  pub limit: Option<i64>,
}

/// GET /api/users/me
pub async fn get_profile(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let user = auth_db::get_user(&conn, auth.user_id)?
    .ok_or_else(|| AppError::not_found("User not found"))?;
  let overview = learning::overview(&conn, auth.user_id, Utc::now())?;
  Ok(ok(Profile { user, overview }))
}

/// PUT /api/users/me
pub async fn update_profile(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<UpdateProfileRequest>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let user = auth_db::get_user(&conn, auth.user_id)?
    .ok_or_else(|| AppError::not_found("User not found"))?;

  let display_name = match req.display_name {
    Some(name) if !is_valid_display_name(&name) => {
      return Err(AppError::validation(format!(
        "Display name must be 1-{} characters",
        MAX_DISPLAY_NAME_LEN
      )));
    }
    Some(name) => name.trim().to_string(),
    None => user.display_name,
  };

  let preferences = req.preferences.unwrap_or(user.preferences);
  if !(1..=MAX_DAILY_GOAL).contains(&preferences.daily_goal) {
    return Err(AppError::validation(format!(
      "daily_goal must be between 1 and {}",
      MAX_DAILY_GOAL
    )));
  }

  auth_db::update_profile(&conn, auth.user_id, &display_name, &preferences)?;
  let user = auth_db::get_user(&conn, auth.user_id)?
    .ok_or_else(|| AppError::not_found("User not found"))?;
  Ok(ok(user))
}

/// PUT /api/users/me/password
///
/// Every other session of the user is signed out.
pub async fn change_password(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<ChangePasswordRequest>,
) -> ApiResult {
  if !password::is_valid_password(&req.new_password) {
    return Err(AppError::validation(format!(
      "Password must be {}-{} characters",
      password::MIN_PASSWORD_LEN,
      password::MAX_PASSWORD_LEN
    )));
  }

  let stored = {
    let conn = try_lock(&state.db)?;
    auth_db::get_password_hash(&conn, auth.user_id)?
      .ok_or_else(|| AppError::not_found("User not found"))?
  };
  if !password::verify_password(&req.current_password, &stored) {
    return Err(AppError::unauthorized("Current password is incorrect"));
  }
  let new_hash = password::hash_password(&req.new_password)
    .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))?;

  let conn = try_lock(&state.db)?;
  auth_db::update_password_hash(&conn, auth.user_id, &new_hash)?;
  let signed_out = auth_db::delete_other_sessions(&conn, auth.user_id, &auth.token)?;
  tracing::info!(user_id = auth.user_id, signed_out, "Password changed");
  Ok(ok_message("Password updated", serde_json::Value::Null))
}

/// GET /api/users/me/stats?days=
pub async fn get_stats(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<StatsQuery>,
) -> ApiResult {
  let days = query.days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS);
  let since = Utc::now().date_naive() - Duration::days(days - 1);

  let conn = try_lock(&state.db)?;
  let daily = stats::get_daily_stats(&conn, auth.user_id, since)?;
  let totals = stats::lifetime_totals(&conn, auth.user_id)?;
  Ok(ok(json!({
    "days": days,
    "daily": daily,
    "totals": totals,
  })))
}

/// GET /api/users/leaderboard?limit=
pub async fn leaderboard(
  State(state): State<AppState>,
  _auth: AuthContext,
  Query(query): Query<LeaderboardQuery>,
) -> ApiResult {
  let limit = query
    .limit
    .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
    .clamp(1, MAX_LEADERBOARD_SIZE);
  let conn = try_lock(&state.db)?;
  Ok(ok(stats::leaderboard(&conn, limit)?))
}
