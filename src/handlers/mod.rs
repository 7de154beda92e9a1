pub mod achievements;
pub mod admin;
pub mod categories;
pub mod notifications;
pub mod progress;
pub mod quizzes;
pub mod users;
pub mod word_sets;
pub mod words;

use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::db::{schema, try_lock};
use crate::response::{ok, ApiResult};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> ApiResult {
  let conn = try_lock(&state.db)?;
  let schema_version = schema::get_schema_version(&conn)?;
  Ok(ok(json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
    "schema_version": schema_version,
  })))
}

/// `?page=&limit=` query parameters, 1-based pages
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

impl Pagination {
  pub fn page(&self) -> i64 {
    self.page.unwrap_or(1).max(1)
  }

  pub fn limit(&self) -> i64 {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> i64 {
    (self.page() - 1) * self.limit()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pagination_defaults_and_clamps() {
    let p = Pagination::default();
    assert_eq!((p.page(), p.limit(), p.offset()), (1, DEFAULT_PAGE_SIZE, 0));

    let p = Pagination { page: Some(3), limit: Some(10) };
    assert_eq!(p.offset(), 20);

    let p = Pagination { page: Some(0), limit: Some(10_000) };
    assert_eq!((p.page(), p.limit()), (1, MAX_PAGE_SIZE));
  }
}
