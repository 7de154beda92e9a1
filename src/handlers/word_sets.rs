use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthContext;
use crate::config::MAX_BULK_WORDS;
use crate::db::{try_lock, word_sets, words};
use crate::domain::{Word, WordSet};
use crate::response::{created, ok, ok_message, ApiResult, AppError};
use crate::services::learning::visible_word;
use crate::state::AppState;

pub const MAX_SET_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct WordSetRequest {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub is_public: bool,
}

#[derive(Deserialize)]
pub struct AddWordsRequest {
  pub word_ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct WordSetDetail {
  #[serde(flatten)]
  pub set: WordSet,
  pub words: Vec<Word>,
}

fn clean_request(req: WordSetRequest) -> Result<(String, Option<String>, bool), AppError> {
  let name = req.name.trim().to_string();
  let len = name.chars().count();
  if len == 0 || len > MAX_SET_NAME_LEN {
    return Err(AppError::validation(format!(
      "Word set name must be 1-{} characters",
      MAX_SET_NAME_LEN
    )));
  }
  let description = req.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
  Ok((name, description, req.is_public))
}

fn visible_set(conn: &Connection, user_id: i64, set_id: i64) -> Result<WordSet, AppError> {
  let set = word_sets::get_word_set(conn, set_id)?
    .ok_or_else(|| AppError::not_found("Word set not found"))?;
  if set.owner_id != user_id && !set.is_public {
    return Err(AppError::forbidden("You do not have access to this word set"));
  }
  Ok(set)
}

fn owned_set(conn: &Connection, user_id: i64, set_id: i64) -> Result<WordSet, AppError> {
  let set = visible_set(conn, user_id, set_id)?;
  if set.owner_id != user_id {
    return Err(AppError::forbidden("You can only modify your own word sets"));
  }
  Ok(set)
}

/// GET /api/word-sets
pub async fn list_word_sets(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(word_sets::list_word_sets(&conn, auth.user_id)?))
}

/// POST /api/word-sets
pub async fn create_word_set(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<WordSetRequest>,
) -> ApiResult {
  let (name, description, is_public) = clean_request(req)?;
  let conn = try_lock(&state.db)?;
  let set = word_sets::create_word_set(
    &conn,
    auth.user_id,
    &name,
    description.as_deref(),
    is_public,
    Utc::now(),
  )?;
  Ok(created(set))
}

/// GET /api/word-sets/{id}
///
/// Words the caller cannot see (made private by their owner) are left out.
pub async fn get_word_set(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(set_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let set = visible_set(&conn, auth.user_id, set_id)?;
  let ids = word_sets::get_word_ids(&conn, set_id)?;
  let words = words::get_words_by_ids(&conn, &ids)?
    .into_iter()
    .filter(|w| w.owner_id == auth.user_id || w.is_public)
    .collect();
  Ok(ok(WordSetDetail { set, words }))
}

/// PUT /api/word-sets/{id}
pub async fn update_word_set(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(set_id): Path<i64>,
  Json(req): Json<WordSetRequest>,
) -> ApiResult {
  let (name, description, is_public) = clean_request(req)?;
  let conn = try_lock(&state.db)?;
  owned_set(&conn, auth.user_id, set_id)?;
  let set = word_sets::update_word_set(
    &conn,
    set_id,
    &name,
    description.as_deref(),
    is_public,
    Utc::now(),
  )?
  .ok_or_else(|| AppError::not_found("Word set not found"))?;
  Ok(ok(set))
}

/// DELETE /api/word-sets/{id}
pub async fn delete_word_set(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(set_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  owned_set(&conn, auth.user_id, set_id)?;
  word_sets::delete_word_set(&conn, set_id)?;
  Ok(ok_message("Word set deleted", json!({ "id": set_id })))
}

/// POST /api/word-sets/{id}/words
pub async fn add_words(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(set_id): Path<i64>,
  Json(req): Json<AddWordsRequest>,
) -> ApiResult {
  if req.word_ids.is_empty() || req.word_ids.len() > MAX_BULK_WORDS {
    return Err(AppError::validation(format!(
      "Between 1 and {} words can be added at once",
      MAX_BULK_WORDS
    )));
  }

  let conn = try_lock(&state.db)?;
  owned_set(&conn, auth.user_id, set_id)?;
  for word_id in &req.word_ids {
    visible_word(&conn, auth.user_id, *word_id)?;
  }
  let added = word_sets::add_words(&conn, set_id, &req.word_ids, Utc::now())?;
  let set = word_sets::get_word_set(&conn, set_id)?
    .ok_or_else(|| AppError::not_found("Word set not found"))?;
  Ok(ok(json!({ "added": added, "word_set": set })))
}

/// DELETE /api/word-sets/{id}/words/{word_id}
pub async fn remove_word(
  State(state): State<AppState>,
  auth: AuthContext,
  Path((set_id, word_id)): Path<(i64, i64)>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  owned_set(&conn, auth.user_id, set_id)?;
  if !word_sets::remove_word(&conn, set_id, word_id)? {
    return Err(AppError::not_found("Word is not in this set"));
  }
  Ok(ok_message("Word removed", json!({ "set_id": set_id, "word_id": word_id })))
}

/// GET /api/word-sets/{id}/stats
pub async fn word_set_stats(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(set_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  visible_set(&conn, auth.user_id, set_id)?;
  Ok(ok(word_sets::set_stats(&conn, set_id, auth.user_id)?))
}
