use axum::extract::State;

use crate::auth::AuthContext;
use crate::db::{badges, try_lock};
use crate::response::{ok, ApiResult};
use crate::services::achievements::badge_statuses;
use crate::state::AppState;

/// GET /api/achievements
pub async fn list_achievements(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(badges::list_achievements(&conn, auth.user_id)?))
}

/// GET /api/achievements/badges
pub async fn list_badges(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(badge_statuses(&conn, auth.user_id)?))
}
