pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod paths;
pub mod response;
pub mod services;
pub mod session;
pub mod srs;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
  routing::{delete, get, post, put},
  Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
  let static_dir = state.config.static_dir.clone();

  let api = Router::new()
    .route("/health", get(handlers::health))
    // Auth
    .route("/auth/register", post(auth::handlers::register))
    .route("/auth/login", post(auth::handlers::login))
    .route("/auth/logout", post(auth::handlers::logout))
    .route("/auth/me", get(auth::handlers::me))
    // Users
    .route("/users/me", get(handlers::users::get_profile).put(handlers::users::update_profile))
    .route("/users/me/password", put(handlers::users::change_password))
    .route("/users/me/stats", get(handlers::users::get_stats))
    .route("/users/leaderboard", get(handlers::users::leaderboard))
    // Words
    .route("/words", get(handlers::words::list_words).post(handlers::words::create_word))
    .route("/words/bulk", post(handlers::words::create_words_bulk))
    .route(
      "/words/{id}",
      get(handlers::words::get_word)
        .put(handlers::words::update_word)
        .delete(handlers::words::delete_word),
    )
    // Categories
    .route(
      "/categories",
      get(handlers::categories::list_categories).post(handlers::categories::create_category),
    )
    .route(
      "/categories/{id}",
      get(handlers::categories::get_category)
        .put(handlers::categories::update_category)
        .delete(handlers::categories::delete_category),
    )
    // Word sets
    .route(
      "/word-sets",
      get(handlers::word_sets::list_word_sets).post(handlers::word_sets::create_word_set),
    )
    .route(
      "/word-sets/{id}",
      get(handlers::word_sets::get_word_set)
        .put(handlers::word_sets::update_word_set)
        .delete(handlers::word_sets::delete_word_set),
    )
    .route("/word-sets/{id}/words", post(handlers::word_sets::add_words))
    .route("/word-sets/{id}/words/{word_id}", delete(handlers::word_sets::remove_word))
    .route("/word-sets/{id}/stats", get(handlers::word_sets::word_set_stats))
    // Progress
    .route("/progress", get(handlers::progress::overview))
    .route("/progress/answer", post(handlers::progress::record_answer))
    .route("/progress/sessions", post(handlers::progress::save_session))
    .route("/progress/review", get(handlers::progress::review_queue))
    .route("/progress/words/{word_id}", get(handlers::progress::word_progress))
    // Tests
    .route("/tests", get(handlers::quizzes::list_tests).post(handlers::quizzes::create_test))
    .route("/tests/results", get(handlers::quizzes::list_results))
    .route("/tests/results/{id}", get(handlers::quizzes::get_result))
    .route("/tests/{id}", get(handlers::quizzes::get_test))
    .route("/tests/{id}/submit", post(handlers::quizzes::submit_test))
    // Achievements
    .route("/achievements", get(handlers::achievements::list_achievements))
    .route("/achievements/badges", get(handlers::achievements::list_badges))
    // Notifications
    .route("/notifications", get(handlers::notifications::list_notifications))
    .route("/notifications/unread-count", get(handlers::notifications::unread_count))
    .route("/notifications/read-all", put(handlers::notifications::mark_all_read))
    .route("/notifications/{id}/read", put(handlers::notifications::mark_read))
    .route("/notifications/{id}", delete(handlers::notifications::delete_notification))
    // Admin
    .route("/admin/users", get(handlers::admin::list_users))
    .route("/admin/users/{id}/role", put(handlers::admin::set_role))
    .route("/admin/stats", get(handlers::admin::system_stats))
    .route("/admin/badges/{id}", put(handlers::admin::update_badge));

  Router::new()
    .nest("/api", api)
    .fallback_service(ServeDir::new(static_dir))
    .with_state(state)
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}
