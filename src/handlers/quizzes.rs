//! Tests: generation, submission and results. Tests are private to their creator.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::{quizzes, try_lock};
use crate::domain::QuizView;
use crate::response::{created, ok, ApiResult};
use crate::services::events::outcome_events;
use crate::services::quiz::{self, CreateQuizRequest, SubmitQuizRequest};
use crate::state::AppState;

pub const DEFAULT_RESULTS_LIMIT: i64 = 20;
pub const MAX_RESULTS_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ResultsQuery {
  pub limit: Option<i64>,
}

/// POST /api/tests
pub async fn create_test(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<CreateQuizRequest>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let test = quiz::create_quiz(&conn, auth.user_id, &req, Utc::now())?;
  Ok(created(QuizView::from(&test)))
}

/// GET /api/tests
pub async fn list_tests(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let tests: Vec<QuizView> = quizzes::list_quizzes(&conn, auth.user_id)?
    .iter()
    .map(QuizView::from)
    .collect();
  Ok(ok(tests))
}

/// GET /api/tests/{id}
pub async fn get_test(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(test_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let test = quiz::owned_quiz(&conn, auth.user_id, test_id)?;
  Ok(ok(QuizView::from(&test)))
}

/// POST /api/tests/{id}/submit
pub async fn submit_test(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(test_id): Path<i64>,
  Json(req): Json<SubmitQuizRequest>,
) -> ApiResult {
  let outcome = {
    let conn = try_lock(&state.db)?;
    quiz::submit_quiz(&conn, auth.user_id, test_id, &req, Utc::now())?
  };
  state.events.publish_all(outcome_events(
    auth.user_id,
    outcome.leveled_up,
    outcome.level,
    outcome.streak_milestone,
  ));
  Ok(created(outcome))
}

/// GET /api/tests/results?limit=
pub async fn list_results(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<ResultsQuery>,
) -> ApiResult {
  let limit = query.limit.unwrap_or(DEFAULT_RESULTS_LIMIT).clamp(1, MAX_RESULTS_LIMIT);
  let conn = try_lock(&state.db)?;
  Ok(ok(quizzes::list_results(&conn, auth.user_id, limit)?))
}

/// GET /api/tests/results/{id}
pub async fn get_result(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(result_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(quiz::owned_result(&conn, auth.user_id, result_id)?))
}
