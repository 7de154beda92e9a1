//! Categories are private to their owner.

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::db::{categories, try_lock};
use crate::domain::word::slugify;
use crate::domain::Category;
use crate::response::{created, ok, ok_message, ApiResult, AppError};
use crate::state::AppState;

pub const MAX_CATEGORY_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct CategoryRequest {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  /// `#rrggbb`
  #[serde(default)]
  pub color: Option<String>,
}

/// Validated request fields
struct CategoryFields {
  name: String,
  description: Option<String>,
  color: Option<String>,
}

fn is_valid_color(color: &str) -> bool {
  color.len() == 7 && color.starts_with('#') && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl CategoryRequest {
  fn validate(self) -> Result<CategoryFields, AppError> {
    let name = self.name.trim().to_string();
    let len = name.chars().count();
    if len == 0 || len > MAX_CATEGORY_NAME_LEN {
      return Err(AppError::validation(format!(
        "Category name must be 1-{} characters",
        MAX_CATEGORY_NAME_LEN
      )));
    }
    let color = self.color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    if color.as_deref().is_some_and(|c| !is_valid_color(c)) {
      return Err(AppError::validation("color must look like #1a2b3c"));
    }
    Ok(CategoryFields {
      name,
      description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
      color,
    })
  }
}

fn owned_category(conn: &Connection, user_id: i64, category_id: i64) -> Result<Category, AppError> {
  let category = categories::get_category(conn, category_id)?
    .ok_or_else(|| AppError::not_found("Category not found"))?;
  if category.owner_id != user_id {
    return Err(AppError::forbidden("You do not have access to this category"));
  }
  Ok(category)
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(categories::list_categories(&conn, auth.user_id)?))
}

/// POST /api/categories
pub async fn create_category(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<CategoryRequest>,
) -> ApiResult {
  let fields = req.validate()?;
  let conn = try_lock(&state.db)?;
  if categories::slug_taken(&conn, auth.user_id, &slugify(&fields.name), None)? {
    return Err(AppError::conflict("A category with this name already exists"));
  }
  let category = categories::create_category(
    &conn,
    auth.user_id,
    &fields.name,
    fields.description.as_deref(),
    fields.color.as_deref(),
    Utc::now(),
  )?;
  Ok(created(category))
}

/// GET /api/categories/{id}
pub async fn get_category(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(category_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  Ok(ok(owned_category(&conn, auth.user_id, category_id)?))
}

/// PUT /api/categories/{id}
pub async fn update_category(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(category_id): Path<i64>,
  Json(req): Json<CategoryRequest>,
) -> ApiResult {
  let fields = req.validate()?;
  let conn = try_lock(&state.db)?;
  owned_category(&conn, auth.user_id, category_id)?;
  if categories::slug_taken(&conn, auth.user_id, &slugify(&fields.name), Some(category_id))? {
    return Err(AppError::conflict("A category with this name already exists"));
  }
  let category = categories::update_category(
    &conn,
    category_id,
    &fields.name,
    fields.description.as_deref(),
    fields.color.as_deref(),
  )?
  .ok_or_else(|| AppError::not_found("Category not found"))?;
  Ok(ok(category))
}

/// DELETE /api/categories/{id}
///
/// Removes the category's words along with their set memberships and progress.
pub async fn delete_category(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(category_id): Path<i64>,
) -> ApiResult {
  let conn = try_lock(&state.db)?;
  owned_category(&conn, auth.user_id, category_id)?;
  let deleted_words = categories::delete_category_cascade(&conn, category_id)?
    .ok_or_else(|| AppError::not_found("Category not found"))?;
  tracing::info!(user_id = auth.user_id, category_id, deleted_words, "Deleted category");
  Ok(ok_message(
    "Category deleted",
    json!({ "id": category_id, "deleted_words": deleted_words }),
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_color_validation() {
    assert!(is_valid_color("#1a2B3c"));
    assert!(!is_valid_color("1a2b3c"));
    assert!(!is_valid_color("#12345"));
    assert!(!is_valid_color("#12345g"));
  }

  #[test]
  fn test_request_trims_and_rejects_blank_name() {
    let req = CategoryRequest {
      name: "  Đồ ăn ".to_string(),
      description: Some("  ".to_string()),
      color: None,
    };
    let fields = req.validate().unwrap();
    assert_eq!(fields.name, "Đồ ăn");
    assert!(fields.description.is_none());

    let req = CategoryRequest { name: "   ".to_string(), description: None, color: None };
    assert!(req.validate().is_err());
  }
}
