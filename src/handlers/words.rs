//! Vocabulary CRUD.
//!
//! Users read their own and public words and write only their own; admins may
//! edit or delete any word.

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Pagination;
use crate::auth::AuthContext;
use crate::config::MAX_BULK_WORDS;
use crate::db::words::{self, WordFilter};
use crate::db::{categories, try_lock};
use crate::domain::{Difficulty, Word, WordInput};
use crate::response::{created, ok, ok_message, ApiResult, AppError};
use crate::services::events::LearningEvent;
use crate::services::learning::visible_word;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WordQuery {
  pub category_id: Option<i64>,
  pub difficulty: Option<String>,
  pub q: Option<String>,
  #[serde(default)]
  pub mine: bool,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct WordPage {
  pub words: Vec<Word>,
  pub total: i64,
  pub page: i64,
  pub limit: i64,
}

#[derive(Deserialize)]
pub struct BulkWordsRequest {
  pub words: Vec<WordInput>,
}

/// Normalise and validate input, checking that a referenced category belongs to `owner_id`
fn prepare_input(conn: &Connection, owner_id: i64, input: WordInput) -> Result<WordInput, AppError> {
  let input = input.normalized();
  input.validate().map_err(AppError::validation)?;
  if let Some(category_id) = input.category_id {
    let category = categories::get_category(conn, category_id)?
      .ok_or_else(|| AppError::validation("Category does not exist"))?;
    if category.owner_id != owner_id {
      return Err(AppError::forbidden("You do not have access to this category"));
    }
  }
  Ok(input)
}

/// Load a word the caller may modify
fn editable_word(conn: &Connection, auth: &AuthContext, word_id: i64) -> Result<Word, AppError> {
  let word = words::get_word(conn, word_id)?.ok_or_else(|| AppError::not_found("Word not found"))?;
  if word.owner_id != auth.user_id && !auth.is_admin() {
    return Err(AppError::forbidden("You can only modify your own words"));
  }
  Ok(word)
}

/// GET /api/words
pub async fn list_words(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<WordQuery>,
) -> ApiResult {
  let difficulty = match query.difficulty.as_deref().filter(|d| !d.is_empty()) {
    Some(d) => Some(
      Difficulty::from_str(d)
        .ok_or_else(|| AppError::validation("difficulty must be easy, medium or hard"))?,
    ),
    None => None,
  };
  let page = Pagination {
    page: query.page,
    limit: query.limit,
  };
  let filter = WordFilter {
    category_id: query.category_id,
    difficulty,
    query: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
    mine: query.mine,
    limit: page.limit(),
    offset: page.offset(),
  };

  let conn = try_lock(&state.db)?;
  let (words, total) = words::list_words(&conn, auth.user_id, &filter)?;
  Ok(ok(WordPage {
    words,
    total,
    page: page.page(),
    limit: filter.limit,
  }))
}

/// POST /api/words
pub async fn create_word(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(input): Json<WordInput>,
) -> ApiResult {
  let word = {
    let conn = try_lock(&state.db)?;
    let input = prepare_input(&conn, auth.user_id, input)?;
    words::create_word(&conn, auth.user_id, &input, Utc::now())?
  };
  state.events.publish(LearningEvent::Activity { user_id: auth.user_id });
  Ok(created(word))
}

/// POST /api/words/bulk
///
/// All words are inserted or none are.
pub async fn create_words_bulk(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<BulkWordsRequest>,
) -> ApiResult {
  if req.words.is_empty() || req.words.len() > MAX_BULK_WORDS {
    return Err(AppError::validation(format!(
      "Between 1 and {} words can be imported at once",
      MAX_BULK_WORDS
    )));
  }

  let created_words = {
    let conn = try_lock(&state.db)?;
    let mut inputs = Vec::with_capacity(req.words.len());
    for (i, input) in req.words.into_iter().enumerate() {
      let input = prepare_input(&conn, auth.user_id, input).map_err(|e| {
        if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
          e
        } else {
          AppError::validation(format!("Word {}: {}", i + 1, e))
        }
      })?;
      inputs.push(input);
    }
    words::create_words_bulk(&conn, auth.user_id, &inputs, Utc::now())?
  };

  tracing::info!(user_id = auth.user_id, count = created_words.len(), "Bulk imported words");
  state.events.publish(LearningEvent::Activity { user_id: auth.user_id });
  Ok(created(json!({
    "created": created_words.len(),
    "words": created_words,
  })))
}

/// GET /api/words/{id}
pub async fn get_word(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(word_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(visible_word(&conn, auth.user_id, word_id)?))
}

/// PUT /api/words/{id}
pub async fn update_word(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(word_id): Path<i64>,
  Json(input): Json<WordInput>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let existing = editable_word(&conn, &auth, word_id)?;
  // Categories are checked against the word's owner, not the editing admin
  let input = prepare_input(&conn, existing.owner_id, input)?;
  let word = words::update_word(&conn, word_id, &input, Utc::now())?
    .ok_or_else(|| AppError::not_found("Word not found"))?;
  Ok(ok(word))
}

/// DELETE /api/words/{id}
pub async fn delete_word(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(word_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  editable_word(&conn, &auth, word_id)?;
  if !words::delete_word(&conn, word_id)? {
    return Err(AppError::not_found("Word not found"));
  }
  tracing::debug!(user_id = auth.user_id, word_id, "Deleted word");
  Ok(ok_message("Word deleted", json!({ "id": word_id })))
}
