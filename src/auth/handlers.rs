//! Authentication handlers for register, login, logout and the current user.

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use super::db as auth_db;
use super::middleware::{AuthContext, SESSION_COOKIE_NAME};
use super::password;
use crate::db::{try_lock, LogOnError};
use crate::domain::{Role, User};
use crate::response::{created, ok, ok_message, ApiResult, AppError};
use crate::session::generate_token;
use crate::state::AppState;

pub const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Display names are 1-50 characters after trimming
pub fn is_valid_display_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (1..=MAX_DISPLAY_NAME_LEN).contains(&len)
}

fn session_cookie(token: String, hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .max_age(time::Duration::hours(hours))
        .build()
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("A valid email address is required"));
    }
    if !password::is_valid_password(&req.password) {
        return Err(AppError::validation(format!(
            "Password must be {}-{} characters",
            password::MIN_PASSWORD_LEN,
            password::MAX_PASSWORD_LEN
        )));
    }
    if !is_valid_display_name(&req.display_name) {
        return Err(AppError::validation(format!(
            "Display name must be 1-{} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }

    // Hash before taking the lock; Argon2 is deliberately slow
    let password_hash = password::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))?;

    let role = if state.config.admin_email.as_deref() == Some(email.as_str()) {
        Role::Admin
    } else {
        Role::User
    };

    let conn = try_lock(&state.db)?;
    if auth_db::email_exists(&conn, &email)? {
        return Err(AppError::conflict("Email is already registered"));
    }

    let user_id = auth_db::create_user(&conn, &email, &password_hash, req.display_name.trim(), role)?;
    let token = generate_token();
    auth_db::create_session(&conn, user_id, &token, state.config.session_hours)?;
    let user = auth_db::get_user(&conn, user_id)?
        .ok_or_else(|| AppError::internal("user vanished after insert"))?;
    drop(conn);

    tracing::info!(user_id, "Registered new user");
    let cookie = session_cookie(token.clone(), state.config.session_hours);
    Ok((jar.add(cookie), created(AuthPayload { token, user })).into_response())
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let credentials = {
        let conn = try_lock(&state.db)?;
        auth_db::get_credentials_by_email(&conn, &email)?
    };
    let invalid = || AppError::unauthorized("Invalid email or password");
    let (user_id, stored_hash) = credentials.ok_or_else(invalid)?;

    // Verify outside the lock
    if !password::verify_password(&req.password, &stored_hash) {
        tracing::debug!(user_id, "Failed login attempt");
        return Err(invalid());
    }

    let conn = try_lock(&state.db)?;
    auth_db::update_last_login(&conn, user_id).log_warn("Failed to update last login");
    let token = generate_token();
    auth_db::create_session(&conn, user_id, &token, state.config.session_hours)?;
    let user = auth_db::get_user(&conn, user_id)?.ok_or_else(invalid)?;
    drop(conn);

    let cookie = session_cookie(token.clone(), state.config.session_hours);
    Ok((jar.add(cookie), ok(AuthPayload { token, user })).into_response())
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, auth: AuthContext, jar: CookieJar) -> ApiResult {
    {
        let conn = try_lock(&state.db)?;
        auth_db::delete_session(&conn, &auth.token)?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"));
    Ok((jar, ok_message("Logged out", serde_json::Value::Null)).into_response())
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult {
    let conn = try_lock(&state.db)?;
    let user = auth_db::get_user(&conn, auth.user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ok(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("lan@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.vn"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("a@@example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@.com"));
    }

    #[test]
    fn test_display_name_validation() {
        assert!(is_valid_display_name("Lan"));
        assert!(is_valid_display_name("  Nguyễn Thị Lan  "));
        assert!(!is_valid_display_name("   "));
        assert!(!is_valid_display_name(&"x".repeat(51)));
    }
}
