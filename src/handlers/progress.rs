//! Answer recording, practice sessions and the review queue.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::config::REVIEW_SESSION_CAP;
use crate::db::try_lock;
use crate::domain::PracticeMode;
use crate::response::{ok, ApiResult, AppError};
use crate::services::events::outcome_events;
use crate::services::learning::{self, AnswerInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SessionRequest {
  pub mode: String,
  #[serde(default)]
  pub duration_secs: i64,
  pub answers: Vec<AnswerInput>,
}

#[derive(Deserialize)]
pub struct ReviewQuery {
  pub limit: Option<usize>,
}

/// GET /api/progress
pub async fn overview(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(learning::overview(&conn, auth.user_id, Utc::now())?))
}

/// POST /api/progress/answer
pub async fn record_answer(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<AnswerInput>,
) -> ApiResult {
  let outcome = {
    let conn = try_lock(&state.db)?;
    learning::record_answer(&conn, auth.user_id, req.word_id, req.correct, Utc::now())?
  };
  state.events.publish_all(outcome_events(
    auth.user_id,
    outcome.leveled_up,
    outcome.level,
    outcome.streak_milestone,
  ));
  Ok(ok(outcome))
}

/// POST /api/progress/sessions
pub async fn save_session(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<SessionRequest>,
) -> ApiResult {
  let mode = PracticeMode::from_str(&req.mode).ok_or_else(|| {
    AppError::validation("mode must be flashcard, multiple_choice, typing or listening")
  })?;
  if req.duration_secs < 0 {
    return Err(AppError::validation("duration_secs must not be negative"));
  }

  let outcome = {
    let conn = try_lock(&state.db)?;
    learning::save_practice_session(&conn, auth.user_id, mode, &req.answers, req.duration_secs, Utc::now())?
  };
  state.events.publish_all(outcome_events(
    auth.user_id,
    outcome.leveled_up,
    outcome.level,
    outcome.streak_milestone,
  ));
  Ok(ok(outcome))
}

/// GET /api/progress/review?limit=
pub async fn review_queue(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<ReviewQuery>,
) -> ApiResult {
  let limit = query.limit.unwrap_or(REVIEW_SESSION_CAP).max(1);
  let conn = try_lock(&state.db)?;
  Ok(ok(learning::review_queue(&conn, auth.user_id, limit, Utc::now())?))
}

/// GET /api/progress/words/{word_id}
pub async fn word_progress(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(word_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(learning::word_progress(&conn, auth.user_id, word_id, Utc::now())?))
}
